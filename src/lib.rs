//! # Fatura
//!
//! Order invoices for right-to-left retail shops.
//!
//! One order goes in; two artifacts come out: a plain-text summary message
//! and a paginated PDF invoice with joined, visually ordered Arabic text,
//! computed totals and QR codes linking to map locations. Both are then
//! handed to a delivery endpoint.
//!
//! ## Architecture
//!
//! ```text
//! Order (JSON)
//!       ↓
//!   [aggregate] validation, totals, distance from the shop ([geo])
//!       ↓
//!   [layout]    ordered blocks, every string shaped once ([text])
//!       ↓
//!   [render]    pagination, repeated table headers
//!       ↓
//!   [pdf]       page sink: fonts, images, PDF bytes
//!       ↓
//!   [dispatch]  summary + document to the transport
//! ```
//!
//! Intermediate QR images live in a per-order [`workspace`] that is removed
//! once the document has been dispatched (or the render failed).

pub mod aggregate;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod font;
pub mod geo;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod qr;
pub mod render;
pub mod style;
pub mod summary;
pub mod text;
pub mod workspace;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aggregate::OrderAggregate;
use config::AppConfig;
use dispatch::{ArtifactDispatcher, DeliveryTransport, DispatchReport};
use error::{FaturaError, RenderError};
use layout::{Block, InvoiceSettings};
use model::Order;
use pdf::PdfSink;
use qr::{PngQrEncoder, QrEncoder, TimedEncoder};
use style::StyleSheet;
use workspace::RenderWorkspace;

/// A finished invoice file.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    /// Hex MD5 of `bytes`, for logs.
    pub content_hash: String,
}

impl RenderedDocument {
    pub fn new(bytes: Vec<u8>) -> Self {
        let content_hash = format!("{:x}", md5::compute(&bytes));
        Self { bytes, content_hash }
    }

    /// Attachment name, e.g. `invoice-1a2b3c4d.pdf`.
    pub fn file_name(&self) -> String {
        let short = self.content_hash.get(..8).unwrap_or(&self.content_hash);
        format!("invoice-{short}.pdf")
    }
}

/// Everything produced for one order, ready to dispatch.
#[derive(Debug)]
pub struct PreparedInvoice {
    pub aggregate: OrderAggregate,
    pub blocks: Vec<Block>,
    pub summary: String,
    pub caption: String,
    pub document: RenderedDocument,
    workspace: RenderWorkspace,
}

impl PreparedInvoice {
    /// Scratch files backing this invoice.
    pub fn workspace(&self) -> &RenderWorkspace {
        &self.workspace
    }

    /// Send both artifacts. The workspace is released afterwards.
    pub fn dispatch<T: DeliveryTransport>(self, dispatcher: &ArtifactDispatcher<T>) -> DispatchReport {
        dispatcher.dispatch(&self.summary, &self.document, &self.caption, self.workspace)
    }

    /// Keep the document, drop the scratch files.
    pub fn into_document(self) -> RenderedDocument {
        if let Err(e) = self.workspace.close() {
            tracing::warn!(error = %e, "render workspace cleanup failed");
        }
        self.document
    }
}

/// The configured order → invoice pipeline. Holds no per-order state.
pub struct InvoicePipeline {
    settings: InvoiceSettings,
    style: StyleSheet,
    encoder: Arc<dyn QrEncoder>,
    qr_timeout: Duration,
    workspace_root: PathBuf,
}

impl InvoicePipeline {
    pub fn new(settings: InvoiceSettings, style: StyleSheet) -> Self {
        let encoder = Arc::new(PngQrEncoder::from_style(&style.qr));
        Self {
            settings,
            style,
            encoder,
            qr_timeout: Duration::from_secs(2),
            workspace_root: std::env::temp_dir(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, FaturaError> {
        Ok(Self::new(config.invoice.clone(), config.style_sheet()?).with_qr_timeout(config.qr_timeout()))
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn QrEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_qr_timeout(mut self, timeout: Duration) -> Self {
        self.qr_timeout = timeout;
        self
    }

    /// Create order workspaces under `root` instead of the system temp dir.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    pub fn settings(&self) -> &InvoiceSettings {
        &self.settings
    }

    pub fn style(&self) -> &StyleSheet {
        &self.style
    }

    /// Validate, lay out and render `order`.
    ///
    /// Validation errors are returned before any file is created. If
    /// rendering fails the workspace is removed before returning.
    pub fn prepare(&self, order: &Order) -> Result<PreparedInvoice, FaturaError> {
        let _span = tracing::info_span!("invoice", customer = %order.customer.name).entered();

        let aggregate = aggregate::aggregate(order, self.settings.reference).map_err(|e| {
            tracing::warn!(error = %e, "order rejected");
            e
        })?;

        let mut workspace = RenderWorkspace::in_dir(&self.workspace_root)?;
        let encoder = TimedEncoder::new(Arc::clone(&self.encoder), self.qr_timeout);
        let blocks = layout::compose(order, &aggregate, &self.settings, &self.style, &mut |payload: &str| {
            let png = encoder.encode(payload)?;
            workspace.write_image(&png)
        });

        let caption = self.settings.document_caption(order);
        let document = render_document(&blocks, &self.style, &caption)?;
        let summary = summary::compose_summary(order, &aggregate, &self.settings);

        Ok(PreparedInvoice {
            aggregate,
            blocks,
            summary,
            caption,
            document,
            workspace,
        })
    }

    /// Prepare `order` and send both artifacts through `dispatcher`.
    ///
    /// Delivery failures are reported in the returned [`DispatchReport`].
    pub fn notify<T: DeliveryTransport>(
        &self,
        order: &Order,
        dispatcher: &ArtifactDispatcher<T>,
    ) -> Result<DispatchReport, FaturaError> {
        Ok(self.prepare(order)?.dispatch(dispatcher))
    }
}

/// Render `blocks` to PDF.
///
/// If the style's fonts cannot be loaded or embedded, the document is
/// rendered again with the built-in fonts instead of failing.
pub fn render_document(blocks: &[Block], style: &StyleSheet, title: &str) -> Result<RenderedDocument, RenderError> {
    match render_pdf(blocks, style, title) {
        Err(RenderError::Font(e)) if !style.fonts.is_builtin() => {
            let families: Vec<&str> = style
                .fonts
                .regular
                .iter()
                .chain(style.fonts.bold.iter())
                .map(|f| f.family.as_str())
                .collect();
            tracing::warn!(error = %e, ?families, "custom fonts unavailable, using built-in fonts");
            render_pdf(blocks, &style.with_builtin_fonts(), title)
        }
        other => other,
    }
}

fn render_pdf(blocks: &[Block], style: &StyleSheet, title: &str) -> Result<RenderedDocument, RenderError> {
    let mut sink = PdfSink::new(style)?.with_title(title);
    let bytes = render::render(blocks, style, &mut sink)?;
    let document = RenderedDocument::new(bytes);
    tracing::info!(
        pages = sink.page_count(),
        bytes = document.bytes.len(),
        hash = %document.content_hash,
        "invoice rendered"
    );
    Ok(document)
}
