//! Status vocabularies
//!
//! Each provider's codes are mapped onto the UDM vocabulary by a total
//! function; unknown values take the documented default.

/// `EnrollmentStatus` values
pub mod enrollment {
    pub const ACTIVE: &str = "Active";
    pub const EXPIRED: &str = "Expired";
    pub const INVITE_PENDING: &str = "Invite pending";
    pub const REQUEST_PENDING: &str = "Request pending";
    pub const ARCHIVED: &str = "Archived";
}

/// `SubmissionStatus` values
pub mod submission {
    pub const LATE: &str = "late";
    pub const MISSING: &str = "missing";
    pub const GRADED: &str = "graded";
    pub const UPCOMING: &str = "upcoming";
    pub const ON_TIME: &str = "on-time";
}

/// Canvas `enrollment_state`; inactive and unknown states are archived
pub fn canvas_enrollment_status(state: &str) -> &'static str {
    match state {
        "active" => enrollment::ACTIVE,
        "invited" => enrollment::INVITE_PENDING,
        _ => enrollment::ARCHIVED,
    }
}

/// Schoology numeric enrollment status
pub fn schoology_enrollment_status(code: &str) -> &'static str {
    match code.trim() {
        "1" => enrollment::ACTIVE,
        "2" => enrollment::EXPIRED,
        "3" => enrollment::INVITE_PENDING,
        "4" => enrollment::REQUEST_PENDING,
        _ => enrollment::ARCHIVED,
    }
}

/// Schoology numeric attendance status
pub fn schoology_attendance_status(code: &str) -> &'static str {
    match code.trim() {
        "1" => "present",
        "2" => "absent",
        "3" => "late",
        "4" => "excused",
        _ => "unknown",
    }
}

/// Facts a submission status is derived from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionFacts {
    pub late: bool,
    pub missing: bool,
    pub graded: bool,
    pub upcoming: bool,
}

/// Pick the status by priority: late, missing, graded, upcoming, on-time
pub fn submission_status(facts: SubmissionFacts) -> &'static str {
    if facts.late {
        submission::LATE
    } else if facts.missing {
        submission::MISSING
    } else if facts.graded {
        submission::GRADED
    } else if facts.upcoming {
        submission::UPCOMING
    } else {
        submission::ON_TIME
    }
}
