//! Tax document (DTE) assembly and the emission seam.

pub mod emission;
pub mod payload;
#[cfg(any(test, feature = "test-support"))]
pub mod recording;
pub mod words;

pub use emission::{EmissionError, EmittedDocument, InvoiceEmitter, UnconfiguredInvoiceEmitter};
#[cfg(any(test, feature = "test-support"))]
pub use recording::{RecordedEmission, RecordingInvoiceEmitter};
pub use payload::{el_salvador_local, DtePayload, DtePayloadBuilder, TIPO_DTE_FACTURA};
pub use words::amount_in_words;
