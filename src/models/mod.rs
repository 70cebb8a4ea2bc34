pub mod company;
pub mod user;

pub use company::{
    CompanyDetails, CompanyRegistration, CompanyRegistrationRequest, CompanyStatus, ManagerDetails,
    Organization,
};
pub use user::{AccessToken, Identity, SignupRequest};
