pub mod charts;
pub mod panels;

use lube_dash::{Session, UploadState};

/// Message shown in the top bar after a user action.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Info(String),
    Error(String),
}

/// Everything the widgets read and mutate.
pub struct UiState {
    pub session: Session,
    pub status: Option<Status>,
}

impl UiState {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            status: None,
        }
    }

    /// Advance a running upload by one archive entry. Returns `true` while
    /// more frames are needed.
    pub fn drive_upload(&mut self) -> bool {
        match self.session.poll_upload() {
            Ok(UploadState::Extracting(_)) => true,
            Ok(UploadState::Loaded) => {
                let rows = self.session.table().map(|t| t.len()).unwrap_or_default();
                self.status = Some(Status::Info(format!("{rows} linhas carregadas.")));
                false
            }
            Ok(UploadState::Idle) => false,
            Err(e) => {
                log::error!("Upload failed: {e}");
                self.status = Some(Status::Error(format!("Erro: {e}")));
                false
            }
        }
    }
}
