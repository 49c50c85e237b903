//! User-facing notices raised by the paging engine.
//!
//! Missing folders, permission problems and undecodable images are not fatal:
//! the operation that hit them yields an empty result and the user is told
//! through a notice channel drained by the front end.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::error::{Result, ViewerError};

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A folder or file disappeared before it could be read.
    NotFound(PathBuf),
    /// Permission to read a folder or file was refused.
    AccessDenied(PathBuf),
    /// An image could not be decoded.
    DecodeFailure { path: PathBuf, message: String },
}

/// Notice sink shared by everything that touches the filesystem.
#[derive(Debug)]
pub struct Notices {
    tx: Option<mpsc::UnboundedSender<Notice>>,
    suppress_decode: AtomicBool,
}

impl Notices {
    /// Deliver notices to `tx`.
    pub fn new(tx: mpsc::UnboundedSender<Notice>) -> Self {
        Self {
            tx: Some(tx),
            suppress_decode: AtomicBool::new(false),
        }
    }

    /// A sink that only logs.
    pub fn silent() -> Self {
        Self {
            tx: None,
            suppress_decode: AtomicBool::new(false),
        }
    }

    pub fn report(&self, notice: Notice) {
        log::warn!("{:?}", notice);
        if let Some(tx) = &self.tx {
            let _ = tx.send(notice);
        }
    }

    /// Report a NotFound or AccessDenied error. Other errors are ignored.
    pub fn report_access_error(&self, err: &ViewerError) {
        match err {
            ViewerError::NotFound(path) => self.report(Notice::NotFound(path.clone())),
            ViewerError::AccessDenied(path) => self.report(Notice::AccessDenied(path.clone())),
            _ => {}
        }
    }

    /// Report a decode failure unless decode failures have been silenced.
    pub fn report_decode_failure(&self, path: &Path, message: String) {
        if self.decode_failures_suppressed() {
            log::debug!("suppressed decode failure for {}: {}", path.display(), message);
            return;
        }
        self.report(Notice::DecodeFailure {
            path: path.to_path_buf(),
            message,
        });
    }

    /// Silence decode-failure notices for the rest of the session.
    pub fn suppress_decode_failures(&self) {
        self.suppress_decode.store(true, Ordering::Relaxed);
    }

    pub fn decode_failures_suppressed(&self) -> bool {
        self.suppress_decode.load(Ordering::Relaxed)
    }
}

/// Run a filesystem operation on `path`, turning NotFound and AccessDenied
/// into a notice and `Ok(None)`. Any other error is returned unchanged.
pub async fn guard_access<T, F>(notices: &Notices, path: &Path, op: F) -> Result<Option<T>>
where
    F: Future<Output = Result<T>>,
{
    match op.await {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_access_error() => {
            log::debug!("access error under {}: {}", path.display(), e);
            notices.report_access_error(&e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;

    #[tokio::test]
    async fn guard_access_reports_not_found() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notices = Notices::new(tx);
        let path = Path::new("/gone");
        let result: Option<u32> = guard_access(&notices, path, async {
            Err(ViewerError::NotFound(PathBuf::from("/gone")))
        })
        .await
        .unwrap();
        assert!(result.is_none());
        assert_eq!(rx.try_recv().unwrap(), Notice::NotFound(PathBuf::from("/gone")));
    }

    #[tokio::test]
    async fn guard_access_reports_access_denied() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notices = Notices::new(tx);
        let result: Option<u32> = guard_access(&notices, Path::new("/root"), async {
            Err(ViewerError::AccessDenied(PathBuf::from("/root")))
        })
        .await
        .unwrap();
        assert!(result.is_none());
        assert!(matches!(rx.try_recv().unwrap(), Notice::AccessDenied(_)));
    }

    #[tokio::test]
    async fn guard_access_propagates_other_errors() {
        let notices = Notices::silent();
        let result: Result<Option<u32>> = guard_access(&notices, Path::new("/x"), async {
            Err(ViewerError::Io(Arc::new(io::Error::new(io::ErrorKind::Other, "boom"))))
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn guard_access_passes_values_through() {
        let notices = Notices::silent();
        let result = guard_access(&notices, Path::new("/x"), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(result, Some(7));
    }

    #[test]
    fn suppression_is_one_way() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notices = Notices::new(tx);
        notices.report_decode_failure(Path::new("/a.png"), "bad".into());
        assert!(rx.try_recv().is_ok());

        notices.suppress_decode_failures();
        notices.report_decode_failure(Path::new("/b.png"), "bad".into());
        assert!(rx.try_recv().is_err());
        assert!(notices.decode_failures_suppressed());
    }

    #[test]
    fn suppression_does_not_hide_access_notices() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notices = Notices::new(tx);
        notices.suppress_decode_failures();
        notices.report_access_error(&ViewerError::NotFound(PathBuf::from("/x")));
        assert!(rx.try_recv().is_ok());
    }
}
