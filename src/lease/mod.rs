//! Lease coordination settings.
//!
//! # Data Flow
//! ```text
//! --enable-lease-controller --lease-label "k8s-app=konnectivity-server"
//!     → selector.rs (parse label selector)
//!     → LabelSelector stored on the validated options
//!     → lease controller lists and labels leases with it
//! ```
//!
//! # Design Decisions
//! - The label is only parsed when the lease controller is enabled
//! - Parsing follows the Kubernetes label selector grammar
//! - Equality-only selectors double as the label set for published leases

pub mod selector;

pub use selector::{parse_label_selector, LabelSelector, Operator, Requirement, SelectorError};
