//! The remote repository seam used by the reconcilers.

use serde_json::Value;

use crate::error::SyncError;
use crate::transport::{RequestOptions, Transport};

/// The only status the server uses to acknowledge a write.
pub const STATUS_OK: u16 = 200;

/// Remote configuration repository.
///
/// `fetch_all` failures are fatal for the run; `push` and `delete` return the
/// HTTP status so a rejected write can be reported without aborting.
pub trait Remote {
    /// `GET path`: the full entity listing.
    fn fetch_all(&self, path: &str) -> Result<Vec<Value>, SyncError>;

    /// `POST path` with a JSON body: upsert one entity.
    fn push(&self, path: &str, body: &Value) -> Result<u16, SyncError>;

    /// `DELETE path`: remove one entity.
    fn delete(&self, path: &str) -> Result<u16, SyncError>;
}

/// [`Remote`] over the authenticated HTTP [`Transport`].
#[derive(Clone)]
pub struct HttpRemote {
    transport: Transport,
}

impl HttpRemote {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}

impl Remote for HttpRemote {
    fn fetch_all(&self, path: &str) -> Result<Vec<Value>, SyncError> {
        let response = self.transport.request(path, RequestOptions::get())?;
        if response.status != STATUS_OK {
            return Err(SyncError::RemoteFetch {
                path: path.to_string(),
                reason: format!("HTTP {}", response.status),
            });
        }
        match serde_json::from_str::<Value>(&response.body) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(_) => Err(SyncError::RemoteFetch {
                path: path.to_string(),
                reason: "expected a JSON array".to_string(),
            }),
            Err(err) => Err(SyncError::RemoteFetch {
                path: path.to_string(),
                reason: format!("response was not JSON: {err}"),
            }),
        }
    }

    fn push(&self, path: &str, body: &Value) -> Result<u16, SyncError> {
        let payload = serde_json::to_string(body).map_err(|e| SyncError::Json {
            path: path.into(),
            source: e,
        })?;
        Ok(self
            .transport
            .request(path, RequestOptions::post(payload))?
            .status)
    }

    fn delete(&self, path: &str) -> Result<u16, SyncError> {
        Ok(self.transport.request(path, RequestOptions::delete())?.status)
    }
}
