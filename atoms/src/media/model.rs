use chrono::{DateTime, Utc};
use url::Url;

use crate::error::StorageError;

/// An object as listed by the image store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub key: String,
    /// `None` when the store does not report it.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Image bytes as they arrive from the client, with the name the user gave
/// the file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn content_type(&self) -> String {
        content_type_for(&self.file_name)
    }
}

/// Storage key for an upload: `<uuid v4>-<file name>`. The random prefix
/// keeps keys unique even when two users upload `photo.png`.
pub fn storage_key(file_name: &str) -> String {
    format!("{}-{}", uuid::Uuid::new_v4(), base_file_name(file_name))
}

/// Last path component of a client-supplied file name, `image` if nothing
/// usable is left.
fn base_file_name(file_name: &str) -> &str {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        "image"
    } else {
        name
    }
}

pub fn content_type_for(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .to_string()
}

/// Parse the base under which stored objects are publicly reachable.
pub fn parse_public_base(base: &str) -> Result<Url, StorageError> {
    let url = Url::parse(base).map_err(|_| StorageError::InvalidUrl(base.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(StorageError::InvalidUrl(base.to_string()));
    }
    Ok(url)
}

/// Public URL of `key` under `base`. The key is a single, percent-encoded
/// path segment.
pub fn public_url_for(base: &Url, key: &str) -> Result<String, StorageError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| StorageError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .push(key);
    Ok(url.to_string())
}

/// Last path segment of an image URL, percent-encoded the way
/// [`public_url_for`] writes it. This is the storage key whatever base the URL
/// was built on.
pub fn url_key_segment(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// Whether `value` can be persisted as an image URL: an absolute http(s)
/// URL with a host. Rejects `blob:` / `data:` previews and relative paths.
pub fn is_public_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn keys_are_unique_for_the_same_file_name() {
        let first = storage_key("photo.png");
        let second = storage_key("photo.png");

        assert_ne!(first, second);
        assert!(first.ends_with("-photo.png"));
        assert!(second.ends_with("-photo.png"));
    }

    #[rstest]
    #[case("photo.png", "photo.png")]
    #[case("C:\\Users\\me\\photo.png", "photo.png")]
    #[case("../../etc/passwd", "passwd")]
    #[case("", "image")]
    #[case("dir/", "image")]
    fn keys_drop_path_components(#[case] file_name: &str, #[case] expected: &str) {
        let key = storage_key(file_name);
        let (prefix, rest) = key.split_at(36);

        assert!(uuid::Uuid::parse_str(prefix).is_ok());
        assert_eq!(rest, format!("-{}", expected));
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[rstest]
    #[case("https://bucket.s3.ap-southeast-2.amazonaws.com/", "https://bucket.s3.ap-southeast-2.amazonaws.com/k.png")]
    #[case("https://cdn.example.com/images", "https://cdn.example.com/images/k.png")]
    #[case("https://cdn.example.com/images/", "https://cdn.example.com/images/k.png")]
    fn public_url_joins_base_and_key(#[case] base: &str, #[case] expected: &str) {
        let base = parse_public_base(base).unwrap();

        assert_eq!(public_url_for(&base, "k.png").unwrap(), expected);
    }

    #[test]
    fn public_url_encodes_the_key() {
        let base = parse_public_base("https://cdn.example.com/").unwrap();

        let url = public_url_for(&base, "id-my photo.png").unwrap();

        assert_eq!(url, "https://cdn.example.com/id-my%20photo.png");
        assert!(is_public_url(&url));
    }

    #[rstest]
    #[case("not a url")]
    #[case("ftp://files.example.com/")]
    #[case("mailto:someone@example.com")]
    fn rejects_unusable_bases(#[case] base: &str) {
        assert!(matches!(
            parse_public_base(base),
            Err(StorageError::InvalidUrl(_))
        ));
    }

    #[rstest]
    #[case("https://manage-task-images.s3.ap-southeast-2.amazonaws.com/abc-cat.png")]
    #[case("https://cdn.example.com/images/abc-cat.png")]
    #[case("http://localhost/images/abc-cat.png/")]
    fn key_segment_ignores_the_base(#[case] url: &str) {
        assert_eq!(url_key_segment(url).as_deref(), Some("abc-cat.png"));
    }

    #[test]
    fn key_segment_matches_across_bases_for_encoded_keys() {
        let s3 = parse_public_base("https://bucket.s3.ap-southeast-2.amazonaws.com/").unwrap();
        let cdn = parse_public_base("https://cdn.example.com/images/").unwrap();

        let old = public_url_for(&s3, "id-my photo+1.png").unwrap();
        let new = public_url_for(&cdn, "id-my photo+1.png").unwrap();

        assert_ne!(old, new);
        assert_eq!(url_key_segment(&old), url_key_segment(&new));
    }

    #[rstest]
    #[case("")]
    #[case("blob:http://localhost:3000/1b9d6bcd")]
    #[case("https://cdn.example.com/")]
    fn no_key_segment_without_a_path(#[case] url: &str) {
        assert_eq!(url_key_segment(url), None);
    }

    #[rstest]
    #[case("https://x/old.png", true)]
    #[case("http://localhost:9000/a.png", true)]
    #[case("blob:http://localhost:3000/1b9d6bcd", false)]
    #[case("data:image/png;base64,AAAA", false)]
    #[case("/local/preview.png", false)]
    #[case("", false)]
    fn recognises_public_urls(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(is_public_url(value), expected);
    }
}
