use serde::{
    Deserialize,
    Serialize,
};

pub const STATUS_SUCCESSFUL: &str = "successful";
pub const STATUS_FAILURE: &str = "failure";

/// Body of a routing decision: which node greets the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub message: String,
    pub status: String,
}

/// Current membership, in the shape the admin endpoints return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipMessage {
    #[serde(rename = "N")]
    pub n: usize,
    pub replicas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipResponse {
    pub message: MembershipMessage,
    pub status: String,
}

impl MembershipResponse {
    pub fn successful(members: Vec<String>) -> Self {
        Self {
            message: MembershipMessage {
                n: members.len(),
                replicas: members,
            },
            status: STATUS_SUCCESSFUL.to_string(),
        }
    }
}

/// Body of the add/remove membership requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostnamesRequest {
    pub hostnames: Vec<String>,
}

/// Error body for rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: STATUS_FAILURE.to_string(),
        }
    }
}
