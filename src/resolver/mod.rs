//! Link resolution core
//!
//! - `prefetch`: classify an access as genuine or speculative
//! - `policy`: pure allow/block evaluation of a link snapshot
//! - `lifecycle`: link states and retirement after a consuming access
//! - `token_resolver`: public `resolve` entry point
//!
//! The atomic consume itself lives behind [`crate::storage::LinkStore`].

pub mod clock;
pub mod lifecycle;
pub mod policy;
pub mod prefetch;
pub mod token_resolver;

pub use clock::{Clock, SystemClock};
pub use lifecycle::{LifecycleAuthority, LinkState, RetireAction, Retirement, state_of};
pub use policy::{AccessContext, BlockReason, Decision, evaluate};
pub use prefetch::{AccessKind, RequestHeaders, classify, classify_request};
pub use token_resolver::{ExternalSignal, RequestMetadata, ResolveOutcome, TokenResolver};
