pub mod creem;
pub mod jwt;
pub mod poller;
pub mod quota;
pub mod replicate;

pub use creem::CreemService;
pub use jwt::JwtService;
pub use poller::{PollConfig, PredictionSource, ReplicateSource, poll_until_done};
pub use quota::{Eligibility, QuotaService};
pub use replicate::ReplicateService;
