use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use formforge_core::ids::FieldId;

/// Out-of-band editor for long-form content (a modal in a UI). Resolves
/// with the new content, or `None` when the user dismissed it.
#[async_trait]
pub trait RichContentEditor: Send + Sync {
    async fn edit(&self, field_id: &FieldId, content: &str) -> Option<String>;
}

/// One open editing request, answered through `reply`.
#[derive(Debug)]
pub struct RichContentRequest {
    pub field_id: FieldId,
    pub content: String,
    reply: oneshot::Sender<String>,
}

impl RichContentRequest {
    pub fn complete(self, content: impl Into<String>) {
        // the session may have stopped waiting
        let _ = self.reply.send(content.into());
    }

    /// Dismisses the editor without a result.
    pub fn cancel(self) {}
}

/// Forwards requests to whoever owns the receiving half, e.g. a UI loop.
#[derive(Debug, Clone)]
pub struct ChannelEditor {
    requests: mpsc::UnboundedSender<RichContentRequest>,
}

impl ChannelEditor {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RichContentRequest>) {
        let (requests, rx) = mpsc::unbounded_channel();
        (Self { requests }, rx)
    }
}

#[async_trait]
impl RichContentEditor for ChannelEditor {
    async fn edit(&self, field_id: &FieldId, content: &str) -> Option<String> {
        let (reply, rx) = oneshot::channel();
        let request = RichContentRequest {
            field_id: field_id.clone(),
            content: content.to_owned(),
            reply,
        };
        if self.requests.send(request).is_err() {
            tracing::warn!(field_id = %field_id, "rich content editor is not listening");
            return None;
        }
        rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completed_request_returns_content() {
        let (editor, mut requests) = ChannelEditor::channel();
        let ui = tokio::spawn(async move {
            let request = requests.recv().await.unwrap();
            assert_eq!(request.content, "<p>old</p>");
            request.complete("<p>new</p>");
        });
        let result = editor.edit(&FieldId::new("bio"), "<p>old</p>").await;
        assert_eq!(result.as_deref(), Some("<p>new</p>"));
        ui.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_request_returns_none() {
        let (editor, mut requests) = ChannelEditor::channel();
        let ui = tokio::spawn(async move {
            requests.recv().await.unwrap().cancel();
        });
        assert!(editor.edit(&FieldId::new("bio"), "").await.is_none());
        ui.await.unwrap();
    }

    #[tokio::test]
    async fn closed_channel_returns_none() {
        let (editor, requests) = ChannelEditor::channel();
        drop(requests);
        assert!(editor.edit(&FieldId::new("bio"), "").await.is_none());
    }
}
