//! Rota domain models.
//!
//! Provides the data types of a rota request and its result: the shift
//! calendar, the roster, the shift taxonomy and requirements, soft
//! preferences, and the produced schedule.
//!
//! # Domain Mappings
//!
//! | nurse-rota | Meaning |
//! |------------|---------|
//! | Nurse | Roster member (resource) |
//! | ShiftType | Code with category, hours and times |
//! | ShiftRequirement | Daily headcount and certified minimum |
//! | Preferences | Soft per-day shift requests |
//! | Schedule | One record per nurse per day |

mod calendar;
mod constraint;
mod nurse;
mod preference;
mod schedule;
mod shift;

pub use calendar::{DateRange, ShiftCalendar, WEEK_LEN};
pub use constraint::{ConstraintModel, ConstraintSpec};
pub use nurse::{EmploymentType, Nurse};
pub use preference::Preferences;
pub use schedule::{Schedule, ShiftGrid, ShiftRecord, Violation, ViolationType};
pub use shift::{
    ShiftCategory, ShiftInfo, ShiftRequirement, ShiftRequirements, ShiftType, MAX_CONSECUTIVE_WORK_DAYS, OFF,
};
