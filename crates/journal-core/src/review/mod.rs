//! Review invitation tracker
//!
//! ```text
//! Invited → Accepted → Completed
//!    ↓          ↓
//! Declined   Expired (external sweep; also from Invited)
//! ```

mod review;
mod status;

pub use review::{InvitationFailure, InvitationRequest, Review, ReviewComments, ReviewId, ReviewSubmission};
pub use status::{Recommendation, ReviewStatus};
