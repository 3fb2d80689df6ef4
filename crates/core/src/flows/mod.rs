pub mod engine;
pub mod states;

pub use engine::{FlowTransitionError, QuoteLifecycle};
pub use states::{QuoteOperation, TransitionOutcome, TransitionTarget};
