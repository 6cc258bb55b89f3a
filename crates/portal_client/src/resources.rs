use shared::{
    domain::{ApplicationId, JobId, UserId},
    protocol::{ApplyRequest, MentorDecisionRequest, RecruiterDecisionRequest},
    status::{Actor, StatusFilter},
};

use crate::{
    actions::Decision,
    descriptor::{RequestDescriptor, ResourceKey},
    error::ClientError,
};

pub const MY_APPLICATIONS: &str = "applications/me";
pub const MENTOR_QUEUE: &str = "applications/mentor";
pub const RECRUITER_APPLICATIONS: &str = "applications/recruiter";
pub const STUDENT_PROFILE: &str = "student/profile";
pub const PENDING_STUDENTS: &str = "admin/pending-students";
pub const JOBS: &str = "jobs";

pub const APPLICATIONS_FIELD: &str = "applications";

pub fn key(name: &str) -> ResourceKey {
    ResourceKey::new(name)
}

pub fn decision_key(application_id: &ApplicationId) -> ResourceKey {
    ResourceKey::new(format!("applications/{application_id}/decision"))
}

pub fn my_applications() -> RequestDescriptor {
    RequestDescriptor::get("/api/applications/me").keyed(MY_APPLICATIONS)
}

pub fn mentor_queue() -> RequestDescriptor {
    RequestDescriptor::get("/api/applications/mentor").keyed(MENTOR_QUEUE)
}

/// Switching filters reuses the key, so the latest filter always wins.
pub fn recruiter_applications(filter: StatusFilter) -> RequestDescriptor {
    let descriptor =
        RequestDescriptor::get("/api/applications/recruiter").keyed(RECRUITER_APPLICATIONS);
    match filter {
        StatusFilter::All => descriptor,
        StatusFilter::Only(status) => descriptor.query("status", status.backend_label()),
    }
}

pub fn apply_to_job(job_id: &JobId, student_note: &str) -> Result<RequestDescriptor, ClientError> {
    RequestDescriptor::post(format!("/api/applications/{job_id}/apply"))
        .keyed(format!("jobs/{job_id}/apply"))
        .json(&ApplyRequest {
            student_note: student_note.to_string(),
        })
}

pub fn decision(
    application_id: &ApplicationId,
    decision: &Decision,
) -> Result<RequestDescriptor, ClientError> {
    let action = decision.action.wire_name().to_string();
    match decision.action.actor() {
        Actor::Mentor => RequestDescriptor::put(format!("/api/applications/{application_id}/mentor"))
            .keyed(decision_key(application_id))
            .json(&MentorDecisionRequest {
                action,
                mentor_note: decision.note.clone(),
            }),
        Actor::Recruiter => {
            RequestDescriptor::put(format!("/api/applications/{application_id}/recruiter"))
                .keyed(decision_key(application_id))
                .json(&RecruiterDecisionRequest {
                    action,
                    recruiter_note: decision.note.clone(),
                    interview_date: decision.interview_date,
                })
        }
    }
}

pub fn student_profile() -> RequestDescriptor {
    RequestDescriptor::get("/api/student/profile").keyed(STUDENT_PROFILE)
}

pub fn pending_students() -> RequestDescriptor {
    RequestDescriptor::get("/api/admin/pending-students").keyed(PENDING_STUDENTS)
}

pub fn approve_student(student_id: &UserId) -> RequestDescriptor {
    RequestDescriptor::put(format!("/api/admin/approve-student/{student_id}"))
        .keyed(format!("admin/approve-student/{student_id}"))
}

pub fn jobs() -> RequestDescriptor {
    RequestDescriptor::get("/api/jobs").keyed(JOBS)
}
