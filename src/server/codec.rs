//! Request/response codec and command dispatch.
//!
//! A request is the whole byte stream a client sends before half-closing its
//! socket. It must be a UTF-8 JSON document of the form
//! `{"command": "...", "params": {"key": "value"}}`.

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{Command, CommandRequest, CommandResponse};
use crate::quarantine::QuarantineOperations;
use crate::scanner::FileInspector;

pub const MSG_UNKNOWN_COMMAND: &str = "unknown command";
pub const MSG_INVALID_REQUEST: &str = "invalid request";

/// Decode a complete request document.
pub fn decode_request(bytes: &[u8]) -> Result<CommandRequest> {
    if bytes.is_empty() {
        return Err(Error::MalformedRequest("empty request".to_string()));
    }

    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::MalformedRequest(format!("request is not UTF-8: {}", e)))?;

    serde_json::from_str(text).map_err(|e| Error::MalformedRequest(e.to_string()))
}

/// Encode a response document.
pub fn encode_response(response: &CommandResponse) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(response)?)
}

/// Encode a request document (client side).
pub fn encode_request(request: &CommandRequest) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(request)?)
}

/// Maps commands to file actions.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    inspector: FileInspector,
    quarantine: QuarantineOperations,
}

impl Dispatcher {
    /// Create a dispatcher using the configured quarantine directory.
    pub fn new(config: &Config) -> Self {
        let quarantine = QuarantineOperations::new(config.quarantine.directory.clone());
        log::debug!("Quarantine directory {:?}", quarantine.quarantine_dir());

        Self {
            inspector: FileInspector::new(),
            quarantine,
        }
    }

    /// Run the action named by `request`.
    pub fn dispatch(&self, request: &CommandRequest) -> CommandResponse {
        let command = request.to_command();
        let name = command.name().to_string();
        log::info!("Dispatching {}", name);

        let response = match command {
            Command::CheckLocalFile {
                file_path,
                signature,
            } => self.inspector.inspect(&file_path, &signature),
            Command::QuarantineLocalFile { file_path } => self.quarantine.quarantine(&file_path),
            Command::Unknown(name) => {
                log::warn!("Unknown command {:?}", name);
                CommandResponse::error(MSG_UNKNOWN_COMMAND)
            }
        };

        if response.is_error() {
            log::info!("{} answered with {}", name, response);
        }
        response
    }

    /// Decode, dispatch and encode in one step.
    ///
    /// Requests that fail to decode are answered with `invalid request`.
    pub fn handle(&self, request_bytes: &[u8]) -> Result<Vec<u8>> {
        let response = match decode_request(request_bytes) {
            Ok(request) => self.dispatch(&request),
            Err(e) => {
                log::warn!("{}", e);
                CommandResponse::error(MSG_INVALID_REQUEST)
            }
        };
        encode_response(&response)
    }
}
