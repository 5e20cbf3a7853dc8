//! # quai-pdf — PDF Credential Renderer
//!
//! Renders the vehicle accreditation credential handed to drivers at the
//! venue gate: a fixed-format A4 document with a header, a general
//! information grid, one bordered block per vehicle (paginated, blocks
//! never straddle a page boundary), a message box, the consent line and
//! a QR code carrying the accreditation id.
//!
//! Layout is computed in PDF points against real Helvetica advance
//! widths ([`metrics`]), not character counts. The greedy word wrap in
//! [`wrap`] is the one nontrivial text-layout routine; everything else
//! is straight-line drawing.
//!
//! The whole render is all-or-nothing: any failure aborts and the caller
//! surfaces a generic "PDF generation failed" error. Output is a byte
//! stream; nothing touches the disk.

pub mod metrics;
pub mod render;
pub mod wrap;

pub use render::{render_credential, CredentialPayload, RenderError};
