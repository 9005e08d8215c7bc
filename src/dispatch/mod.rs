//! # Artifact Dispatch
//!
//! Hands the summary message and the rendered invoice to a
//! [`DeliveryTransport`]. The two sends are independent: a failed message
//! does not stop the document, and neither is retried.
//!
//! The render workspace is moved into [`ArtifactDispatcher::dispatch`] and
//! closed once the document attempt has finished, whatever its outcome.

pub mod telegram;

use crate::error::{DispatchError, TransportError};
use crate::workspace::RenderWorkspace;
use crate::RenderedDocument;

/// The external delivery endpoint.
pub trait DeliveryTransport {
    fn send_message(&self, text: &str) -> Result<(), TransportError>;

    fn send_document(&self, document: &RenderedDocument, caption: &str) -> Result<(), TransportError>;
}

/// Outcome of both sends.
#[derive(Debug)]
pub struct DispatchReport {
    pub message: Result<(), DispatchError>,
    pub document: Result<(), DispatchError>,
}

impl DispatchReport {
    pub fn is_success(&self) -> bool {
        self.message.is_ok() && self.document.is_ok()
    }

    /// The first failure, message before document.
    pub fn into_result(self) -> Result<(), DispatchError> {
        self.message.and(self.document)
    }
}

pub struct ArtifactDispatcher<T> {
    transport: T,
}

impl<T: DeliveryTransport> ArtifactDispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn dispatch(
        &self,
        summary: &str,
        document: &RenderedDocument,
        caption: &str,
        workspace: RenderWorkspace,
    ) -> DispatchReport {
        let _span = tracing::info_span!("dispatch", hash = %document.content_hash).entered();

        let message = self.transport.send_message(summary).map_err(DispatchError::Message);
        match &message {
            Ok(()) => tracing::info!("summary message delivered"),
            Err(e) => tracing::warn!(error = %e, "summary message failed"),
        }

        let sent = self
            .transport
            .send_document(document, caption)
            .map_err(DispatchError::Document);
        match &sent {
            Ok(()) => tracing::info!(bytes = document.bytes.len(), "invoice document delivered"),
            Err(e) => tracing::warn!(error = %e, "invoice document failed"),
        }

        if let Err(e) = workspace.close() {
            tracing::warn!(error = %e, "render workspace cleanup failed");
        }

        DispatchReport {
            message,
            document: sent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeTransport {
        fail_message: bool,
        fail_document: bool,
        calls: RefCell<Vec<String>>,
    }

    impl DeliveryTransport for FakeTransport {
        fn send_message(&self, text: &str) -> Result<(), TransportError> {
            self.calls.borrow_mut().push(format!("message:{text}"));
            if self.fail_message {
                return Err(TransportError::Timeout);
            }
            Ok(())
        }

        fn send_document(&self, document: &RenderedDocument, caption: &str) -> Result<(), TransportError> {
            self.calls
                .borrow_mut()
                .push(format!("document:{}:{caption}", document.bytes.len()));
            if self.fail_document {
                return Err(TransportError::Rejected {
                    status: 400,
                    description: "Bad Request: chat not found".to_string(),
                });
            }
            Ok(())
        }
    }

    fn workspace_with_file(parent: &std::path::Path) -> (RenderWorkspace, std::path::PathBuf) {
        let mut ws = RenderWorkspace::in_dir(parent).unwrap();
        let image = ws.write_image(b"png").unwrap();
        (ws, image.path)
    }

    #[test]
    fn test_both_artifacts_sent_in_order() {
        let parent = tempfile::tempdir().unwrap();
        let (ws, file) = workspace_with_file(parent.path());
        let dispatcher = ArtifactDispatcher::new(FakeTransport::default());
        let doc = RenderedDocument::new(b"%PDF-1.7".to_vec());

        let report = dispatcher.dispatch("hello", &doc, "فاتورة", ws);

        assert!(report.is_success());
        assert_eq!(
            *dispatcher.transport().calls.borrow(),
            vec!["message:hello".to_string(), "document:8:فاتورة".to_string()]
        );
        assert!(!file.exists());
    }

    #[test]
    fn test_failed_message_still_sends_document() {
        let parent = tempfile::tempdir().unwrap();
        let (ws, file) = workspace_with_file(parent.path());
        let dispatcher = ArtifactDispatcher::new(FakeTransport {
            fail_message: true,
            ..Default::default()
        });
        let report = dispatcher.dispatch("hello", &RenderedDocument::new(vec![1]), "c", ws);

        assert!(matches!(report.message, Err(DispatchError::Message(TransportError::Timeout))));
        assert!(report.document.is_ok());
        assert_eq!(dispatcher.transport().calls.borrow().len(), 2);
        assert!(!file.exists());
    }

    #[test]
    fn test_failed_document_cleans_up_and_reports() {
        let parent = tempfile::tempdir().unwrap();
        let (ws, file) = workspace_with_file(parent.path());
        let dir = ws.path().to_path_buf();
        let dispatcher = ArtifactDispatcher::new(FakeTransport {
            fail_document: true,
            ..Default::default()
        });
        let report = dispatcher.dispatch("hello", &RenderedDocument::new(vec![1]), "c", ws);

        assert!(!report.is_success());
        let err = report.into_result().unwrap_err();
        assert!(matches!(err, DispatchError::Document(TransportError::Rejected { status: 400, .. })));
        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn test_into_result_prefers_message_error() {
        let report = DispatchReport {
            message: Err(DispatchError::Message(TransportError::Timeout)),
            document: Err(DispatchError::Document(TransportError::Http("x".to_string()))),
        };
        assert!(matches!(report.into_result(), Err(DispatchError::Message(_))));
    }
}
