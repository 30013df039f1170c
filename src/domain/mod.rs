mod budget;
mod money;
mod period;
mod record;
mod user;

pub use budget::*;
pub use money::*;
pub use period::*;
pub use record::*;
pub use user::*;
