//! Schoology extraction
//!
//! Section-level resources are fetched and synced one section at a time, since
//! the mappers need to know which section a record was listed under.

use super::context::Extraction;
use super::features::Feature;
use super::summary::RunSummary;
use crate::adapters::lms::schoology::models::flatten_attendance;
use crate::adapters::lms::schoology::{
    sync_resources, SchoologyApi, SchoologyAssignment, SchoologyAttendance, SchoologyCourse,
    SchoologyEnrollment, SchoologyRole, SchoologySection, SchoologySectionUpdate,
    SchoologySubmission, SchoologyUpdateComment, SchoologyUser,
};
use crate::core::mapping::schoology as mapping;
use crate::core::sync::Synced;
use crate::domain::{LmsError, LmsSectionAssociation, Result, UdmEntity};
use std::collections::HashMap;

pub struct SchoologyExtractor {
    api: SchoologyApi,
}

impl SchoologyExtractor {
    pub fn new(api: SchoologyApi) -> Self {
        Self { api }
    }

    pub async fn run(&self, mut ctx: Extraction) -> Result<RunSummary> {
        if ctx.wants(Feature::Grades) {
            tracing::warn!("Schoology has no grade data, ignoring the grades feature");
        }

        self.users(&mut ctx).await?;

        let started = ctx.start(UdmEntity::Sections);
        let fetched = self.sections(&ctx).await;
        let Some(sections) = ctx.settle(UdmEntity::Sections, fetched)? else {
            skip_below_sections(&mut ctx);
            return Ok(ctx.finish());
        };
        let section_ids: Vec<String> = sections.iter().map(|s| s.record.id.clone()).collect();
        let mapped = mapping::map_sections(&sections);
        ctx.write(UdmEntity::Sections, mapped.len(), started, |w| {
            w.write_root(&mapped).map(|p| vec![p])
        });

        let associations = self.section_associations(&mut ctx, &section_ids).await?;

        if ctx.wants(Feature::Assignments) {
            self.assignments_and_submissions(&mut ctx, &section_ids)
                .await?;
        }

        if ctx.wants(Feature::Activities) {
            self.section_activities(&mut ctx, &section_ids).await?;
        }

        if ctx.wants(Feature::Attendance) {
            match associations {
                Some(associations) => {
                    self.attendance(&mut ctx, &section_ids, &associations)
                        .await?
                }
                None => {
                    ctx.skip_dependent(UdmEntity::AttendanceEvents, UdmEntity::SectionAssociations)
                }
            }
        }

        Ok(ctx.finish())
    }

    async fn users(&self, ctx: &mut Extraction) -> Result<()> {
        let started = ctx.start(UdmEntity::Users);
        let fetched = async {
            let roles: Vec<Synced<SchoologyRole>> = ctx
                .sync(&sync_resources::roles(), self.api.roles().await?)
                .await?;
            let users: Vec<Synced<SchoologyUser>> = ctx
                .sync(&sync_resources::users(), self.api.users().await?)
                .await?;
            Ok::<_, LmsError>((users, roles))
        }
        .await;
        let Some((users, roles)) = ctx.settle(UdmEntity::Users, fetched)? else {
            return Ok(());
        };

        let roles: Vec<SchoologyRole> = roles.into_iter().map(|r| r.record).collect();
        let mapped = mapping::map_users(&users, &roles);
        ctx.write(UdmEntity::Users, mapped.len(), started, |w| {
            w.write_root(&mapped).map(|p| vec![p])
        });
        Ok(())
    }

    async fn sections(&self, ctx: &Extraction) -> Result<Vec<Synced<SchoologySection>>> {
        let courses: Vec<Synced<SchoologyCourse>> = ctx
            .sync(&sync_resources::courses(), self.api.courses().await?)
            .await?;
        let mut sections = Vec::new();
        for course in &courses {
            sections.extend(self.api.sections(&course.record.id).await?);
        }
        ctx.sync(&sync_resources::sections(), sections).await
    }

    /// Write the associations and return them per section
    async fn section_associations(
        &self,
        ctx: &mut Extraction,
        section_ids: &[String],
    ) -> Result<Option<HashMap<String, Vec<LmsSectionAssociation>>>> {
        let started = ctx.start(UdmEntity::SectionAssociations);
        let fetched = async {
            let mut by_section = HashMap::new();
            for section_id in section_ids {
                let enrollments: Vec<Synced<SchoologyEnrollment>> = ctx
                    .sync(
                        &sync_resources::enrollments(),
                        self.api.enrollments(section_id).await?,
                    )
                    .await?;
                by_section.insert(
                    section_id.clone(),
                    mapping::map_section_associations(&enrollments, section_id),
                );
            }
            Ok::<_, LmsError>(by_section)
        }
        .await;
        let Some(by_section) = ctx.settle(UdmEntity::SectionAssociations, fetched)? else {
            return Ok(None);
        };

        let all: Vec<LmsSectionAssociation> = by_section.values().flatten().cloned().collect();
        ctx.write(UdmEntity::SectionAssociations, all.len(), started, |w| {
            w.write_by_section(section_ids, &all)
        });
        Ok(Some(by_section))
    }

    async fn assignments_and_submissions(
        &self,
        ctx: &mut Extraction,
        section_ids: &[String],
    ) -> Result<()> {
        let started = ctx.start(UdmEntity::Assignments);
        let fetched = async {
            let mut mapped = Vec::new();
            for section_id in section_ids {
                let assignments: Vec<Synced<SchoologyAssignment>> = ctx
                    .sync(
                        &sync_resources::assignments(),
                        self.api.assignments(section_id).await?,
                    )
                    .await?;
                mapped.extend(mapping::map_assignments(&assignments, section_id));
            }
            Ok::<_, LmsError>(mapped)
        }
        .await;
        let Some(assignments) = ctx.settle(UdmEntity::Assignments, fetched)? else {
            ctx.skip_dependent(UdmEntity::Submissions, UdmEntity::Assignments);
            return Ok(());
        };
        ctx.write(UdmEntity::Assignments, assignments.len(), started, |w| {
            w.write_by_section(section_ids, &assignments)
        });

        let started = ctx.start(UdmEntity::Submissions);
        let fetched = async {
            let mut per_assignment = Vec::with_capacity(assignments.len());
            for assignment in &assignments {
                let section_id = &assignment.lms_section_source_system_identifier;
                let assignment_id = &assignment.source_system_identifier;
                let submissions: Vec<Synced<SchoologySubmission>> = ctx
                    .sync(
                        &sync_resources::submissions(),
                        self.api.submissions(section_id, assignment_id).await?,
                    )
                    .await?;
                per_assignment.push((
                    section_id.clone(),
                    assignment_id.clone(),
                    mapping::map_submissions(&submissions),
                ));
            }
            Ok::<_, LmsError>(per_assignment)
        }
        .await;
        let Some(per_assignment) = ctx.settle(UdmEntity::Submissions, fetched)? else {
            return Ok(());
        };

        let total = per_assignment.iter().map(|(_, _, rows)| rows.len()).sum();
        ctx.write(UdmEntity::Submissions, total, started, |w| {
            per_assignment
                .iter()
                .map(|(section, assignment, rows)| w.write_submissions(section, assignment, rows))
                .collect()
        });
        Ok(())
    }

    /// Section updates and the comments on them
    async fn section_activities(&self, ctx: &mut Extraction, section_ids: &[String]) -> Result<()> {
        let started = ctx.start(UdmEntity::SectionActivities);
        let fetched = async {
            let mut activities = Vec::new();
            for section_id in section_ids {
                let updates: Vec<Synced<SchoologySectionUpdate>> = ctx
                    .sync(
                        &sync_resources::section_updates(),
                        self.api.section_updates(section_id).await?,
                    )
                    .await?;
                activities.extend(mapping::map_section_updates(&updates, section_id));

                for update in &updates {
                    let comments: Vec<Synced<SchoologyUpdateComment>> = ctx
                        .sync(
                            &sync_resources::update_comments(),
                            self.api
                                .update_comments(section_id, &update.record.id)
                                .await?,
                        )
                        .await?;
                    activities.extend(mapping::map_update_comments(&comments, section_id));
                }
            }
            Ok::<_, LmsError>(activities)
        }
        .await;
        let Some(activities) = ctx.settle(UdmEntity::SectionActivities, fetched)? else {
            return Ok(());
        };

        ctx.write(UdmEntity::SectionActivities, activities.len(), started, |w| {
            w.write_by_section(section_ids, &activities)
        });
        Ok(())
    }

    async fn attendance(
        &self,
        ctx: &mut Extraction,
        section_ids: &[String],
        associations: &HashMap<String, Vec<LmsSectionAssociation>>,
    ) -> Result<()> {
        let started = ctx.start(UdmEntity::AttendanceEvents);
        let fetched = async {
            let mut events = Vec::new();
            for section_id in section_ids {
                let dates = self.api.attendance(section_id).await?;
                let marks = flatten_attendance(&dates)
                    .into_iter()
                    .map(serde_json::to_value)
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let marks: Vec<Synced<SchoologyAttendance>> =
                    ctx.sync(&sync_resources::attendance(), marks).await?;
                let section_associations = associations
                    .get(section_id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                events.extend(mapping::map_attendance(&marks, section_associations));
            }
            Ok::<_, LmsError>(events)
        }
        .await;
        let Some(events) = ctx.settle(UdmEntity::AttendanceEvents, fetched)? else {
            return Ok(());
        };

        ctx.write(UdmEntity::AttendanceEvents, events.len(), started, |w| {
            w.write_by_section(section_ids, &events)
        });
        Ok(())
    }
}

fn skip_below_sections(ctx: &mut Extraction) {
    let mut dependents = vec![UdmEntity::SectionAssociations];
    if ctx.wants(Feature::Assignments) {
        dependents.extend([UdmEntity::Assignments, UdmEntity::Submissions]);
    }
    if ctx.wants(Feature::Activities) {
        dependents.push(UdmEntity::SectionActivities);
    }
    if ctx.wants(Feature::Attendance) {
        dependents.push(UdmEntity::AttendanceEvents);
    }
    for entity in dependents {
        ctx.skip_dependent(entity, UdmEntity::Sections);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::lms::{AuthStrategy, ClientSettings, RequestClient};
    use crate::config::secret_string;
    use crate::core::extract::summary::ResourceOutcome;
    use crate::core::extract::FeatureSet;
    use crate::core::files::{newest_file, read_records, CsvWriter, FileLayout};
    use crate::core::sync::SyncStore;
    use crate::domain::{LmsAttendanceEvent, LmsUser};
    use chrono::Local;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn extractor(url: &str) -> SchoologyExtractor {
        let client = RequestClient::new(
            "Schoology",
            url,
            AuthStrategy::oauth1("key", secret_string("secret".to_string())),
            ClientSettings::default(),
        )
        .unwrap();
        SchoologyExtractor::new(SchoologyApi::new(client))
    }

    #[tokio::test]
    async fn test_attendance_joins_associations() {
        let mut server = Server::new_async().await;
        let routes = [
            ("/roles", json!({"role": [{"id": 3, "title": "Student"}]})),
            (
                "/users",
                json!({"user": [{"uid": 7, "role_id": 3, "name_first": "Grace", "name_last": "Hopper"}]}),
            ),
            ("/courses", json!({"course": [{"id": 1, "title": "Biology"}]})),
            (
                "/courses/1/sections",
                json!({"section": [{"id": "20", "section_title": "Bio 1", "active": 1}]}),
            ),
            (
                "/sections/20/enrollments",
                json!({"enrollment": [{"id": "e1", "uid": 7, "status": "1", "admin": 0}]}),
            ),
            (
                "/sections/20/attendance",
                json!({"date": [{
                    "date": "2021-02-01",
                    "statuses": {"status": [{"attendances": {"attendance": [
                        {"enrollment_id": "e1", "status": 2}
                    ]}}]}
                }]}),
            ),
        ];
        for (path, body) in routes {
            server
                .mock("GET", path)
                .match_query(Matcher::Any)
                .with_body(body.to_string())
                .create_async()
                .await;
        }

        let dir = tempfile::tempdir().unwrap();
        let ctx = Extraction::new(
            "Schoology",
            SyncStore::open_in_memory().await.unwrap(),
            CsvWriter::new(FileLayout::new(&dir.path().to_string_lossy(), Local::now())),
            FeatureSet::parse(&["attendance"]).unwrap(),
        );
        let summary = extractor(&server.url()).run(ctx).await.unwrap();

        assert!(summary.is_successful(), "{:?}", summary.resources);
        assert_eq!(
            summary.outcome("attendance-events"),
            Some(&ResourceOutcome::Written { rows: 1 })
        );

        let users_file = newest_file(&dir.path().join("users")).unwrap().unwrap();
        let users: Vec<LmsUser> = read_records(&users_file).unwrap();
        assert_eq!(users[0].name, "Grace Hopper");
        assert_eq!(users[0].user_role, "Student");

        let dir = dir.path().join("section=20").join("attendance-events");
        let events: Vec<LmsAttendanceEvent> =
            read_records(&newest_file(&dir).unwrap().unwrap()).unwrap();
        assert_eq!(events[0].source_system_identifier, "e1#2021-02-01");
        assert_eq!(events[0].lms_user_source_system_identifier, "7");
        assert_eq!(events[0].attendance_status, "absent");
    }

    #[tokio::test]
    async fn test_failed_sections_skip_dependents() {
        let mut server = Server::new_async().await;
        for (path, body) in [
            ("/roles", json!({"role": []})),
            ("/users", json!({"user": []})),
        ] {
            server
                .mock("GET", path)
                .match_query(Matcher::Any)
                .with_body(body.to_string())
                .create_async()
                .await;
        }
        server
            .mock("GET", "/courses")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body("bad request")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let ctx = Extraction::new(
            "Schoology",
            SyncStore::open_in_memory().await.unwrap(),
            CsvWriter::new(FileLayout::new(&dir.path().to_string_lossy(), Local::now())),
            FeatureSet::parse(&["assignments"]).unwrap(),
        );
        let summary = extractor(&server.url()).run(ctx).await.unwrap();

        assert_eq!(summary.outcome("users"), Some(&ResourceOutcome::Written { rows: 0 }));
        for resource in ["sections", "section-associations", "assignments", "submissions"] {
            assert!(
                matches!(summary.outcome(resource), Some(ResourceOutcome::Skipped { .. })),
                "{resource} should be skipped"
            );
        }
    }
}
