use serde::Deserialize;

use crate::models::post::Post;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

/// `GET /r/{subreddit}/top` response. Missing levels deserialize as empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub data: ListingData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<ListingChild>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingChild {
    #[serde(default)]
    pub data: Post,
}

impl Listing {
    pub fn into_posts(self) -> Vec<Post> {
        self.data.children.into_iter().map(|child| child.data).collect()
    }
}
