use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{domain::Role, error::TransitionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    PendingMentorReview,
    RejectedByMentor,
    PendingRecruiterReview,
    InterviewScheduled,
    Hired,
    RejectedByRecruiter,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 7] = [
        Self::Applied,
        Self::PendingMentorReview,
        Self::RejectedByMentor,
        Self::PendingRecruiterReview,
        Self::InterviewScheduled,
        Self::Hired,
        Self::RejectedByRecruiter,
    ];

    pub const INITIAL: ApplicationStatus = Self::Applied;

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::PendingMentorReview => "pending_mentor_review",
            Self::RejectedByMentor => "rejected_by_mentor",
            Self::PendingRecruiterReview => "pending_recruiter_review",
            Self::InterviewScheduled => "interview_scheduled",
            Self::Hired => "hired",
            Self::RejectedByRecruiter => "rejected_by_recruiter",
        }
    }

    /// Label the portal backend stores and filters on.
    pub fn backend_label(self) -> &'static str {
        match self {
            Self::Applied => "pending mentor approval",
            Self::PendingMentorReview => "pending mentor review",
            Self::RejectedByMentor => "rejected by mentor",
            Self::PendingRecruiterReview => "pending recruiter review",
            Self::InterviewScheduled => "interview scheduled",
            Self::Hired => "hired",
            Self::RejectedByRecruiter => "rejected by recruiter",
        }
    }

    /// Accepts the snake_case names as well as the backend's spaced labels.
    /// The backend's default "pending mentor approval" is its initial state.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "applied" | "pending_mentor_approval" => Some(Self::Applied),
            "pending_mentor_review" => Some(Self::PendingMentorReview),
            "rejected_by_mentor" => Some(Self::RejectedByMentor),
            "pending_recruiter_review" => Some(Self::PendingRecruiterReview),
            "interview_scheduled" => Some(Self::InterviewScheduled),
            "hired" => Some(Self::Hired),
            "rejected_by_recruiter" => Some(Self::RejectedByRecruiter),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::RejectedByMentor | Self::Hired | Self::RejectedByRecruiter
        )
    }

    pub fn presentation(self) -> StatusPresentation {
        let (icon, tone, label) = match self {
            Self::Applied => (StatusIcon::Send, StatusTone::Yellow, "Applied"),
            Self::PendingMentorReview => (
                StatusIcon::Clock,
                StatusTone::Yellow,
                "Pending Mentor Review",
            ),
            Self::RejectedByMentor => (
                StatusIcon::XCircle,
                StatusTone::Red,
                "Rejected by Mentor",
            ),
            Self::PendingRecruiterReview => (
                StatusIcon::Clock,
                StatusTone::Blue,
                "Pending Recruiter Review",
            ),
            Self::InterviewScheduled => (
                StatusIcon::Calendar,
                StatusTone::Purple,
                "Interview Scheduled",
            ),
            Self::Hired => (StatusIcon::CheckCircle, StatusTone::Green, "Hired"),
            Self::RejectedByRecruiter => (
                StatusIcon::XCircle,
                StatusTone::Red,
                "Rejected by Recruiter",
            ),
        };
        StatusPresentation { icon, tone, label }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIcon {
    Send,
    Clock,
    Calendar,
    CheckCircle,
    XCircle,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Yellow,
    Blue,
    Purple,
    Green,
    Red,
    Gray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPresentation {
    pub icon: StatusIcon,
    pub tone: StatusTone,
    pub label: &'static str,
}

impl StatusPresentation {
    pub const UNKNOWN: StatusPresentation = StatusPresentation {
        icon: StatusIcon::Help,
        tone: StatusTone::Gray,
        label: "Unknown",
    };
}

pub fn presentation_for(raw_status: &str) -> StatusPresentation {
    ApplicationStatus::parse(raw_status)
        .map(ApplicationStatus::presentation)
        .unwrap_or(StatusPresentation::UNKNOWN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MentorApprove,
    MentorReject,
    ScheduleInterview,
    RecruiterReject,
    Hire,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Self::MentorApprove,
        Self::MentorReject,
        Self::ScheduleInterview,
        Self::RecruiterReject,
        Self::Hire,
    ];

    pub fn actor(self) -> Actor {
        match self {
            Self::MentorApprove | Self::MentorReject => Actor::Mentor,
            Self::ScheduleInterview | Self::RecruiterReject | Self::Hire => Actor::Recruiter,
        }
    }

    /// Value of the `action` field in the decision body.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::MentorApprove => "approve",
            Self::MentorReject | Self::RecruiterReject => "reject",
            Self::ScheduleInterview => "schedule",
            Self::Hire => "hire",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::MentorApprove => "mentor approves",
            Self::MentorReject => "mentor rejects",
            Self::ScheduleInterview => "recruiter schedules interview",
            Self::RecruiterReject => "recruiter rejects",
            Self::Hire => "recruiter hires",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    Mentor,
    Recruiter,
}

impl Actor {
    pub fn permits(self, role: Role) -> bool {
        match self {
            Self::Mentor => role == Role::Mentor,
            Self::Recruiter => matches!(role, Role::Recruiter | Role::Admin),
        }
    }
}

pub const TRANSITIONS: [(ApplicationStatus, Action, ApplicationStatus); 6] = [
    (
        ApplicationStatus::Applied,
        Action::MentorApprove,
        ApplicationStatus::PendingRecruiterReview,
    ),
    (
        ApplicationStatus::Applied,
        Action::MentorReject,
        ApplicationStatus::RejectedByMentor,
    ),
    (
        ApplicationStatus::PendingRecruiterReview,
        Action::ScheduleInterview,
        ApplicationStatus::InterviewScheduled,
    ),
    (
        ApplicationStatus::PendingRecruiterReview,
        Action::RecruiterReject,
        ApplicationStatus::RejectedByRecruiter,
    ),
    (
        ApplicationStatus::InterviewScheduled,
        Action::Hire,
        ApplicationStatus::Hired,
    ),
    (
        ApplicationStatus::InterviewScheduled,
        Action::RecruiterReject,
        ApplicationStatus::RejectedByRecruiter,
    ),
];

pub fn next_status(from: ApplicationStatus, action: Action) -> Option<ApplicationStatus> {
    TRANSITIONS
        .iter()
        .find(|(src, candidate, _)| *src == from && *candidate == action)
        .map(|(_, _, to)| *to)
}

pub fn transition(
    from: ApplicationStatus,
    action: Action,
) -> Result<ApplicationStatus, TransitionError> {
    next_status(from, action).ok_or_else(|| TransitionError::IllegalTransition {
        from: from.as_str().to_string(),
        action,
    })
}

/// Role check first, then the table. Raw strings that do not parse are
/// treated as a state with no outgoing transitions.
pub fn authorize_transition(
    raw_status: &str,
    action: Action,
    role: Role,
) -> Result<ApplicationStatus, TransitionError> {
    if !action.actor().permits(role) {
        return Err(TransitionError::ActorNotPermitted { role, action });
    }
    let Some(from) = ApplicationStatus::parse(raw_status) else {
        return Err(TransitionError::IllegalTransition {
            from: raw_status.to_string(),
            action,
        });
    };
    transition(from, action)
}

pub fn legal_actions(status: ApplicationStatus, role: Role) -> Vec<Action> {
    TRANSITIONS
        .iter()
        .filter(|(src, action, _)| *src == status && action.actor().permits(role))
        .map(|(_, action, _)| *action)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ApplicationStatus),
}

impl StatusFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        ApplicationStatus::parse(raw).map(Self::Only)
    }

    pub fn matches(self, raw_status: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(status) => ApplicationStatus::parse(raw_status) == Some(status),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts {
    counts: [usize; 7],
    unknown: usize,
}

impl StatusCounts {
    pub fn tally<'a>(statuses: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts = Self::default();
        for raw in statuses {
            match ApplicationStatus::parse(raw) {
                Some(status) => counts.counts[Self::index(status)] += 1,
                None => counts.unknown += 1,
            }
        }
        counts
    }

    pub fn get(&self, status: ApplicationStatus) -> usize {
        self.counts[Self::index(status)]
    }

    pub fn unknown(&self) -> usize {
        self.unknown
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum::<usize>() + self.unknown
    }

    pub fn in_progress(&self) -> usize {
        ApplicationStatus::ALL
            .iter()
            .filter(|status| !status.is_terminal())
            .map(|status| self.get(*status))
            .sum()
    }

    fn index(status: ApplicationStatus) -> usize {
        status as usize
    }
}

#[cfg(test)]
#[path = "tests/status_tests.rs"]
mod tests;
