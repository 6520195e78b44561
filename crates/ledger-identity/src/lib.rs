pub mod device;
pub mod error;
pub mod invite;
pub mod link;
pub mod recovery;

pub use device::{authorize_device, verify_device_authorization};
pub use error::{IdentityError, LinkError};
pub use invite::{issue_invite, verify_invite_token};
pub use link::{decode_invite_link, encode_invite_link, InviteLinkData, InviteLinkToken};
pub use recovery::{co_sign_rotation, recovery_threshold, verify_co_signature};
