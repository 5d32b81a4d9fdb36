//! Google Classroom extraction
//!
//! Classroom courses are the UDM sections. Rosters, coursework and
//! submissions are listed per course; login activity comes from the Reports
//! API for the whole domain.

use super::context::Extraction;
use super::features::Feature;
use super::summary::RunSummary;
use crate::adapters::lms::google::{
    sync_resources, GoogleApi, GoogleCourse, GoogleCourseUser, GoogleCourseWork,
    GoogleLoginActivity, GoogleSubmission,
};
use crate::core::mapping::google as mapping;
use crate::core::sync::Synced;
use crate::domain::{AssignmentSubmission, LmsError, Result, UdmEntity};
use std::collections::BTreeMap;

/// Extraction window; either end may be open
#[derive(Debug, Clone, Default)]
pub struct GoogleOptions {
    /// `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`
    pub end_date: Option<String>,
}

pub struct GoogleExtractor {
    api: GoogleApi,
    options: GoogleOptions,
}

impl GoogleExtractor {
    pub fn new(api: GoogleApi, options: GoogleOptions) -> Self {
        Self { api, options }
    }

    pub async fn run(&self, mut ctx: Extraction) -> Result<RunSummary> {
        if ctx.wants(Feature::Attendance) || ctx.wants(Feature::Grades) {
            tracing::warn!("Google Classroom has no attendance or grade data, ignoring those features");
        }

        let started = ctx.start(UdmEntity::Sections);
        let fetched = async {
            ctx.sync::<GoogleCourse>(&sync_resources::courses(), self.api.courses().await?)
                .await
        }
        .await;
        let Some(courses) = ctx.settle(UdmEntity::Sections, fetched)? else {
            skip_below_sections(&mut ctx);
            return Ok(ctx.finish());
        };
        let course_ids: Vec<String> = courses.iter().map(|c| c.record.id.clone()).collect();

        self.rosters(&mut ctx, &course_ids).await?;

        let sections = mapping::map_sections(&courses);
        ctx.write(UdmEntity::Sections, sections.len(), started, |w| {
            w.write_root(&sections).map(|p| vec![p])
        });

        let wants_assignments = ctx.wants(Feature::Assignments);
        let wants_activities = ctx.wants(Feature::Activities);

        if wants_assignments || wants_activities {
            let submissions = self
                .coursework(&mut ctx, &course_ids, wants_assignments)
                .await?;
            if wants_activities {
                match submissions {
                    Some(submissions) => {
                        let started = ctx.start(UdmEntity::SectionActivities);
                        let activities = mapping::map_submission_activities(&submissions);
                        ctx.write(
                            UdmEntity::SectionActivities,
                            activities.len(),
                            started,
                            |w| w.write_by_section(&course_ids, &activities),
                        );
                    }
                    None => ctx.skip_dependent(UdmEntity::SectionActivities, UdmEntity::Submissions),
                }
            }
        }

        if wants_activities {
            self.system_activities(&mut ctx).await?;
        }

        Ok(ctx.finish())
    }

    /// Users and section associations from the students and teachers of every course
    async fn rosters(&self, ctx: &mut Extraction, course_ids: &[String]) -> Result<()> {
        let started = ctx.start(UdmEntity::Users);
        let fetched = async {
            let mut students = Vec::new();
            let mut teachers = Vec::new();
            for course_id in course_ids {
                students.extend(self.api.students(course_id).await?);
                teachers.extend(self.api.teachers(course_id).await?);
            }
            let students: Vec<Synced<GoogleCourseUser>> =
                ctx.sync(&sync_resources::students(), students).await?;
            let teachers: Vec<Synced<GoogleCourseUser>> =
                ctx.sync(&sync_resources::teachers(), teachers).await?;
            Ok::<_, LmsError>((students, teachers))
        }
        .await;
        let Some((students, teachers)) = ctx.settle(UdmEntity::Users, fetched)? else {
            ctx.skip_dependent(UdmEntity::SectionAssociations, UdmEntity::Users);
            return Ok(());
        };

        let users = mapping::map_users(&students, &teachers);
        ctx.write(UdmEntity::Users, users.len(), started, |w| {
            w.write_root(&users).map(|p| vec![p])
        });

        let started = ctx.start(UdmEntity::SectionAssociations);
        let associations = mapping::map_section_associations(&students, &teachers);
        ctx.write(
            UdmEntity::SectionAssociations,
            associations.len(),
            started,
            |w| w.write_by_section(course_ids, &associations),
        );
        Ok(())
    }

    /// Assignments and submissions; returns the synced submissions for the
    /// activity mapper
    ///
    /// With `write_tables` unset the submissions are fetched for activities
    /// only and no assignment or submission table is written.
    async fn coursework(
        &self,
        ctx: &mut Extraction,
        course_ids: &[String],
        write_tables: bool,
    ) -> Result<Option<Vec<Synced<GoogleSubmission>>>> {
        let mut assignment_keys = Vec::new();
        if write_tables {
            let started = ctx.start(UdmEntity::Assignments);
            let fetched = async {
                let mut course_work = Vec::new();
                for course_id in course_ids {
                    course_work.extend(self.api.course_work(course_id).await?);
                }
                ctx.sync::<GoogleCourseWork>(&sync_resources::course_work(), course_work)
                    .await
            }
            .await;
            let Some(course_work) = ctx.settle(UdmEntity::Assignments, fetched)? else {
                ctx.skip_dependent(UdmEntity::Submissions, UdmEntity::Assignments);
                return Ok(None);
            };

            let assignments = mapping::map_assignments(&course_work);
            ctx.write(UdmEntity::Assignments, assignments.len(), started, |w| {
                w.write_by_section(course_ids, &assignments)
            });
            assignment_keys = assignments
                .into_iter()
                .map(|a| (a.lms_section_source_system_identifier, a.source_system_identifier))
                .collect();
        }

        let started = ctx.start(UdmEntity::Submissions);
        let fetched = async {
            let mut submissions = Vec::new();
            for course_id in course_ids {
                submissions.extend(self.api.submissions(course_id).await?);
            }
            ctx.sync::<GoogleSubmission>(&sync_resources::submissions(), submissions)
                .await
        }
        .await;
        let Some(submissions) = ctx.settle(UdmEntity::Submissions, fetched)? else {
            return Ok(None);
        };

        if write_tables {
            let mut by_assignment: BTreeMap<(String, String), Vec<AssignmentSubmission>> =
                assignment_keys.into_iter().map(|key| (key, Vec::new())).collect();
            for (synced, row) in submissions.iter().zip(mapping::map_submissions(&submissions)) {
                by_assignment
                    .entry((
                        synced.record.course_id.clone(),
                        row.assignment_source_system_identifier.clone(),
                    ))
                    .or_default()
                    .push(row);
            }

            let total = by_assignment.values().map(Vec::len).sum();
            ctx.write(UdmEntity::Submissions, total, started, |w| {
                by_assignment
                    .iter()
                    .map(|((course, assignment), rows)| {
                        w.write_submissions(course, assignment, rows)
                    })
                    .collect()
            });
        }
        Ok(Some(submissions))
    }

    async fn system_activities(&self, ctx: &mut Extraction) -> Result<()> {
        let started = ctx.start(UdmEntity::SystemActivities);
        let start_time = window_start(self.options.start_date.as_deref());
        let end_time = window_end(self.options.end_date.as_deref());
        let fetched = async {
            let activities = self.api.login_activities(&start_time, &end_time).await?;
            ctx.sync::<GoogleLoginActivity>(&sync_resources::login_activities(), activities)
                .await
        }
        .await;
        let Some(activities) = ctx.settle(UdmEntity::SystemActivities, fetched)? else {
            return Ok(());
        };

        let mapped = mapping::map_system_activities(&activities);
        ctx.write(UdmEntity::SystemActivities, mapped.len(), started, |w| {
            w.write_system_activities(&mapped)
        });
        Ok(())
    }
}

fn skip_below_sections(ctx: &mut Extraction) {
    let mut dependents = vec![UdmEntity::Users, UdmEntity::SectionAssociations];
    if ctx.wants(Feature::Assignments) {
        dependents.extend([UdmEntity::Assignments, UdmEntity::Submissions]);
    }
    if ctx.wants(Feature::Activities) {
        dependents.push(UdmEntity::SectionActivities);
    }
    for entity in dependents {
        ctx.skip_dependent(entity, UdmEntity::Sections);
    }
}

/// RFC 3339 start of a `YYYY-MM-DD` date; empty when unbounded
fn window_start(date: Option<&str>) -> String {
    match date {
        Some(d) if d.len() == 10 => format!("{d}T00:00:00.000Z"),
        Some(d) => d.to_string(),
        None => String::new(),
    }
}

/// RFC 3339 end of a `YYYY-MM-DD` date; empty when unbounded
fn window_end(date: Option<&str>) -> String {
    match date {
        Some(d) if d.len() == 10 => format!("{d}T23:59:59.999Z"),
        Some(d) => d.to_string(),
        None => String::new(),
    }
}
