use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(rename = "lastName", default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub cover_image: Option<String>,
    pub occupation: Option<String>,
    pub location: Option<String>,
    pub birth_date: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: String, username: String) -> Self {
        Self {
            id,
            username,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            bio: None,
            profile_picture: None,
            cover_image: None,
            occupation: None,
            location: None,
            birth_date: None,
            joined_at: None,
        }
    }

    /// 表示名（first/last が無ければ username）
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let trimmed = full.trim();
        if trimmed.is_empty() {
            self.username.clone()
        } else {
            trimmed.to_string()
        }
    }
}

/// プロフィール更新の差分（None のフィールドは送信も変更もしない）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.bio.is_none()
            && self.occupation.is_none()
            && self.location.is_none()
            && self.profile_picture.is_none()
            && self.cover_image.is_none()
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(bio) = &self.bio {
            user.bio = Some(bio.clone());
        }
        if let Some(occupation) = &self.occupation {
            user.occupation = Some(occupation.clone());
        }
        if let Some(location) = &self.location {
            user.location = Some(location.clone());
        }
        if let Some(picture) = &self.profile_picture {
            user.profile_picture = Some(picture.clone());
        }
        if let Some(cover) = &self.cover_image {
            user.cover_image = Some(cover.clone());
        }
    }
}

#[cfg(test)]
impl User {
    pub fn sample(id: &str, username: &str) -> Self {
        Self::new(id.to_string(), username.to_string())
    }
}
