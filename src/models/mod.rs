pub mod enums;
pub mod item;
pub mod organization;
pub mod organization_admin;
pub mod profile;
pub mod user;
pub mod user_role;
pub mod verification_request;

pub use enums::{AppRole, Decision, ItemCategory, ItemStatus, ReviewStatus, VerificationStatus};
pub use item::{Entity as Item, Model as ItemModel};
pub use organization::{Entity as Organization, Model as OrganizationModel};
pub use organization_admin::{Entity as OrganizationAdmin, Model as OrganizationAdminModel};
pub use profile::{Entity as Profile, Model as ProfileModel};
pub use user::{Entity as User, Model as UserModel};
pub use user_role::{Entity as UserRole, Model as UserRoleModel};
pub use verification_request::{
    Entity as VerificationRequest, Model as VerificationRequestModel, SecurityAnswers,
};
