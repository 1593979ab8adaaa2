use core::fmt;
use url::Url;

use crate::ClientError;

const SEP: char = '/';
const API_ROOT: &str = "api";

/// Backend address that grows path segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    url: Url,
}

impl Resource {
    pub fn parse(uri: &str) -> Result<Resource, ClientError> {
        let url = Url::parse(uri).map_err(|e| ClientError::InvalidUrl {
            uri: uri.to_owned(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                uri: uri.to_owned(),
                reason: String::from("not a base url"),
            });
        }
        Ok(Resource { url })
    }

    /// Appends `path` keeping exactly one separator between segments.
    /// A trailing separator in `path` is preserved.
    pub fn append_path(&mut self, path: &str) -> &mut Self {
        if let Some(segments) = self.url.path_segments() {
            let joined = segments
                .chain(path.split(SEP))
                .filter(|x| !x.is_empty())
                .collect::<Vec<_>>()
                .join("/");

            if path.ends_with(SEP) {
                self.url.set_path(&format!("{joined}{SEP}"));
            } else {
                self.url.set_path(&joined);
            }
        } else if let Ok(u) = self.url.join(path) {
            self.url = u;
        }
        self
    }

    /// Address of the insert endpoint for one file: `{base}/api/{bucket}/{name}`.
    /// Bucket and name are escaped so they always stay single segments.
    #[must_use]
    pub fn upload_target(&self, bucket: &str, file_name: &str) -> Resource {
        let mut target = self.clone();
        target
            .append_path(API_ROOT)
            .append_path(&url_escape::encode_component(bucket))
            .append_path(&url_escape::encode_component(file_name));
        target
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn parse_correct_ok() {
        // Arrange

        // Act
        let r = Resource::parse("http://localhost");

        // Assert
        assert!(r.is_ok());
    }

    #[test_case("http/localhost" ; "no scheme separator")]
    #[test_case("mailto:someone@example.com" ; "cannot be a base")]
    #[test_case("" ; "empty")]
    fn parse_incorrect_err(uri: &str) {
        // Arrange

        // Act
        let r = Resource::parse(uri);

        // Assert
        assert!(matches!(r, Err(ClientError::InvalidUrl { .. })));
    }

    #[test_case("http://localhost", "x", "http://localhost/x" ; "bare")]
    #[test_case("http://localhost", "/x/", "http://localhost/x/" ; "trailing slash kept")]
    #[test_case("http://localhost/", "/x/y", "http://localhost/x/y" ; "nested")]
    #[test_case("http://localhost/x", "y", "http://localhost/x/y" ; "base with path")]
    #[test_case("http://localhost/x/", "/y/", "http://localhost/x/y/" ; "both slashed")]
    fn append_path_tests(base: &str, path: &str, expected: &str) {
        // Arrange
        let mut r = Resource::parse(base).unwrap();

        // Act
        r.append_path(path);

        // Assert
        assert_eq!(r.to_string().as_str(), expected);
    }

    #[test_case("http://localhost:5000", "b1", "f1", "http://localhost:5000/api/b1/f1" ; "plain")]
    #[test_case("http://localhost:5000/store/", "b1", "f1", "http://localhost:5000/store/api/b1/f1" ; "prefixed base")]
    #[test_case("http://localhost", "b1", "a b.txt", "http://localhost/api/b1/a%20b.txt" ; "space in name")]
    #[test_case("http://localhost", "b1", "d1/f1", "http://localhost/api/b1/d1%2Ff1" ; "slash in name")]
    #[test_case("http://localhost", "my bucket", "f", "http://localhost/api/my%20bucket/f" ; "space in bucket")]
    fn upload_target_tests(base: &str, bucket: &str, name: &str, expected: &str) {
        // Arrange
        let r = Resource::parse(base).unwrap();

        // Act
        let target = r.upload_target(bucket, name);

        // Assert
        assert_eq!(target.as_str(), expected);
        assert_eq!(r.as_str(), Resource::parse(base).unwrap().as_str());
    }
}
