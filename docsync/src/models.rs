use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// A user as stored in the `userdata` collection and sent to `/users`.
///
/// The password travels in plain text on both paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub id: String,
    pub email: String,
    pub password: String,
}

impl UserRecord {
    pub fn demo() -> Self {
        Self {
            name: "Test User".to_string(),
            id: "1234test".to_string(),
            email: "asdf@gmail.com".to_string(),
            password: "123456789".to_string(),
        }
    }
}

/// A post as stored in the `postinfo` collection and sent to `/posts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub caption: String,
    pub image_extension: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub seconds: i64,
}

impl PostRecord {
    pub fn demo() -> Self {
        Self {
            id: "1234test".to_string(),
            caption: "asdfghjkmnbvcxvbnjuytre".to_string(),
            image_extension: "png".to_string(),
            seconds: 0,
        }
    }
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

#[derive(Debug, Default, Deserialize)]
struct Seed {
    user: Option<UserRecord>,
    post: Option<PostRecord>,
}

/// Read the records to sync from a JSON seed file.
///
/// The file holds `{"user": {...}, "post": {...}}`; a missing key falls back
/// to the demo record.
pub fn load_seed(path: &Path) -> anyhow::Result<(UserRecord, PostRecord)> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    let seed: Seed = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse seed file {}", path.display()))?;

    Ok((
        seed.user.unwrap_or_else(UserRecord::demo),
        seed.post.unwrap_or_else(PostRecord::demo),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_user_serializes_with_expected_keys() {
        let json = serde_json::to_value(UserRecord::demo()).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 4);
        assert_eq!(json["name"], "Test User");
        assert_eq!(json["id"], "1234test");
        assert_eq!(json["email"], "asdf@gmail.com");
        assert_eq!(json["password"], "123456789");
    }

    #[test]
    fn post_omits_zero_seconds() {
        let json = serde_json::to_value(PostRecord::demo()).unwrap();
        assert_eq!(json["image_extension"], "png");
        assert!(json.get("seconds").is_none());

        let timed = PostRecord {
            seconds: 42,
            ..PostRecord::demo()
        };
        let json = serde_json::to_value(timed).unwrap();
        assert_eq!(json["seconds"], 42);
    }

    #[test]
    fn post_without_seconds_decodes_as_zero() {
        let post: PostRecord =
            serde_json::from_str(r#"{"id":"p1","caption":"hello","image_extension":"jpg"}"#)
                .unwrap();
        assert_eq!(post.seconds, 0);
    }

    #[test]
    fn decoding_ignores_store_object_id() {
        let user: UserRecord = serde_json::from_str(
            r#"{"_id":"65f0","name":"n","id":"i","email":"e","password":"p"}"#,
        )
        .unwrap();
        assert_eq!(user.id, "i");
    }

    #[test]
    fn seed_falls_back_to_demo_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        fs::write(
            &path,
            r#"{"user":{"name":"Ada","id":"ada1","email":"ada@example.com","password":"pw"}}"#,
        )
        .unwrap();

        let (user, post) = load_seed(&path).unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(post, PostRecord::demo());
    }

    #[test]
    fn seed_reports_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        fs::write(&path, "not json").unwrap();

        let err = load_seed(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse seed file"));
    }
}
