//! Canvas extraction
//!
//! The REST and GraphQL paths differ only in how records are fetched. Both
//! produce REST-shaped JSON, so sync and mapping are shared.

use super::context::Extraction;
use super::features::Feature;
use super::summary::RunSummary;
use crate::adapters::lms::canvas::graphql::{self, GraphQlExtract};
use crate::adapters::lms::canvas::{
    sync_resources, CanvasApi, CanvasAssignment, CanvasAuthenticationEvent, CanvasCourse,
    CanvasEnrollment, CanvasSection, CanvasSubmission, CanvasUser,
};
use crate::adapters::lms::models::scalar_to_string;
use crate::core::mapping::canvas as mapping;
use crate::core::sync::Synced;
use crate::domain::{AssignmentSubmission, Result, UdmEntity};
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct CanvasOptions {
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `YYYY-MM-DD`
    pub end_date: String,
    pub use_graphql: bool,
    pub account_id: String,
}

enum Source<'a> {
    Rest(&'a CanvasApi),
    GraphQl(Box<GraphQlExtract>),
}

struct Catalog {
    course_ids: Vec<String>,
    section_ids: Vec<String>,
    sections: Vec<Synced<CanvasSection>>,
}

pub struct CanvasExtractor {
    api: CanvasApi,
    options: CanvasOptions,
}

impl CanvasExtractor {
    pub fn new(api: CanvasApi, options: CanvasOptions) -> Self {
        Self { api, options }
    }

    pub async fn run(&self, mut ctx: Extraction) -> Result<RunSummary> {
        if ctx.wants(Feature::Attendance) {
            tracing::warn!("Canvas has no attendance data, ignoring the attendance feature");
        }

        let started = ctx.start(UdmEntity::Sections);
        let source = if self.options.use_graphql {
            let fetched = graphql::extract(
                self.api.client(),
                &self.options.account_id,
                &self.options.start_date,
                &self.options.end_date,
            )
            .await;
            match ctx.settle(UdmEntity::Sections, fetched)? {
                Some(extract) => Source::GraphQl(Box::new(extract)),
                None => {
                    skip_below_sections(&mut ctx);
                    return Ok(ctx.finish());
                }
            }
        } else {
            Source::Rest(&self.api)
        };

        let fetched = self.catalog(&ctx, &source).await;
        let Some(catalog) = ctx.settle(UdmEntity::Sections, fetched)? else {
            skip_below_sections(&mut ctx);
            return Ok(ctx.finish());
        };

        let user_ids = self.users(&mut ctx, &source, &catalog).await?;

        let sections = mapping::map_sections(&catalog.sections);
        ctx.write(UdmEntity::Sections, sections.len(), started, |w| {
            w.write_root(&sections).map(|p| vec![p])
        });

        self.section_associations(&mut ctx, &source, &catalog).await?;

        if ctx.wants(Feature::Assignments) {
            self.assignments_and_submissions(&mut ctx, &source, &catalog)
                .await?;
        }

        if ctx.wants(Feature::Activities) {
            match user_ids {
                Some(user_ids) => self.system_activities(&mut ctx, &user_ids).await?,
                None => ctx.skip_dependent(UdmEntity::SystemActivities, UdmEntity::Users),
            }
        }

        Ok(ctx.finish())
    }

    async fn catalog(&self, ctx: &Extraction, source: &Source<'_>) -> Result<Catalog> {
        let (courses, sections) = match source {
            Source::Rest(api) => {
                let courses = api
                    .courses(&self.options.start_date, &self.options.end_date)
                    .await?;
                let mut sections = Vec::new();
                for course in &courses {
                    sections.extend(api.sections(&scalar_to_string(&course["id"])).await?);
                }
                (courses, sections)
            }
            Source::GraphQl(extract) => (extract.courses.clone(), extract.sections.clone()),
        };

        let courses: Vec<Synced<CanvasCourse>> =
            ctx.sync(&sync_resources::courses(), courses).await?;
        let sections: Vec<Synced<CanvasSection>> =
            ctx.sync(&sync_resources::sections(), sections).await?;

        Ok(Catalog {
            course_ids: courses.into_iter().map(|c| c.record.id).collect(),
            section_ids: sections.iter().map(|s| s.record.id.clone()).collect(),
            sections,
        })
    }

    /// Write the users table and return the ids of the users fetched
    async fn users(
        &self,
        ctx: &mut Extraction,
        source: &Source<'_>,
        catalog: &Catalog,
    ) -> Result<Option<Vec<String>>> {
        let started = ctx.start(UdmEntity::Users);
        let fetched = async {
            let students = match source {
                Source::Rest(api) => {
                    let mut students = Vec::new();
                    for course_id in &catalog.course_ids {
                        students.extend(api.students(course_id).await?);
                    }
                    unique_by_id(students)
                }
                Source::GraphQl(extract) => extract.students.clone(),
            };
            ctx.sync::<CanvasUser>(&sync_resources::students(), students)
                .await
        }
        .await;
        let Some(users) = ctx.settle(UdmEntity::Users, fetched)? else {
            return Ok(None);
        };

        let mapped = mapping::map_users(&users);
        ctx.write(UdmEntity::Users, mapped.len(), started, |w| {
            w.write_root(&mapped).map(|p| vec![p])
        });
        Ok(Some(users.into_iter().map(|u| u.record.id).collect()))
    }

    /// Section associations, and grades from the same enrollments
    async fn section_associations(
        &self,
        ctx: &mut Extraction,
        source: &Source<'_>,
        catalog: &Catalog,
    ) -> Result<()> {
        let started = ctx.start(UdmEntity::SectionAssociations);
        let fetched = async {
            let enrollments = match source {
                Source::Rest(api) => {
                    let mut enrollments = Vec::new();
                    for section_id in &catalog.section_ids {
                        enrollments.extend(api.enrollments(section_id).await?);
                    }
                    enrollments
                }
                Source::GraphQl(extract) => extract.enrollments.clone(),
            };
            ctx.sync::<CanvasEnrollment>(&sync_resources::enrollments(), enrollments)
                .await
        }
        .await;
        let Some(enrollments) = ctx.settle(UdmEntity::SectionAssociations, fetched)? else {
            if ctx.wants(Feature::Grades) {
                ctx.skip_dependent(UdmEntity::Grades, UdmEntity::SectionAssociations);
            }
            return Ok(());
        };

        let associations = mapping::map_section_associations(&enrollments);
        ctx.write(
            UdmEntity::SectionAssociations,
            associations.len(),
            started,
            |w| w.write_by_section(&catalog.section_ids, &associations),
        );

        if ctx.wants(Feature::Grades) {
            let started = ctx.start(UdmEntity::Grades);
            let grades = mapping::map_grades(&enrollments);
            ctx.write(UdmEntity::Grades, grades.len(), started, |w| {
                w.write_by_section(&catalog.section_ids, &grades)
            });
        }
        Ok(())
    }

    async fn assignments_and_submissions(
        &self,
        ctx: &mut Extraction,
        source: &Source<'_>,
        catalog: &Catalog,
    ) -> Result<()> {
        let started = ctx.start(UdmEntity::Assignments);
        let fetched = async {
            let assignments = match source {
                Source::Rest(api) => {
                    let mut assignments = Vec::new();
                    for course_id in &catalog.course_ids {
                        assignments.extend(api.assignments(course_id).await?);
                    }
                    assignments
                }
                Source::GraphQl(extract) => extract.assignments.clone(),
            };
            ctx.sync::<CanvasAssignment>(&sync_resources::assignments(), assignments)
                .await
        }
        .await;
        let Some(assignments) = ctx.settle(UdmEntity::Assignments, fetched)? else {
            ctx.skip_dependent(UdmEntity::Submissions, UdmEntity::Assignments);
            return Ok(());
        };

        let sections: Vec<CanvasSection> =
            catalog.sections.iter().map(|s| s.record.clone()).collect();
        let mapped = mapping::map_assignments(&assignments, &sections);
        ctx.write(UdmEntity::Assignments, mapped.len(), started, |w| {
            w.write_by_section(&catalog.section_ids, &mapped)
        });

        let started = ctx.start(UdmEntity::Submissions);
        let fetched = async {
            let submissions = match source {
                Source::Rest(api) => {
                    let mut submissions = Vec::new();
                    for section in &sections {
                        for assignment in assignments
                            .iter()
                            .filter(|a| a.record.course_id == section.course_id)
                        {
                            submissions.extend(
                                api.submissions(&section.id, &assignment.record.id).await?,
                            );
                        }
                    }
                    submissions
                }
                Source::GraphQl(extract) => extract.submissions.clone(),
            };
            ctx.sync::<CanvasSubmission>(&sync_resources::submissions(), submissions)
                .await
        }
        .await;
        let Some(submissions) = ctx.settle(UdmEntity::Submissions, fetched)? else {
            return Ok(());
        };

        let due_dates: HashMap<String, String> = assignments
            .iter()
            .map(|a| (a.record.id.clone(), a.record.due_at.clone()))
            .collect();
        let rows = mapping::map_submissions(&submissions, &due_dates, Utc::now());

        // every assignment gets a file, empty or not
        let mut by_assignment: BTreeMap<(String, String), Vec<AssignmentSubmission>> = mapped
            .iter()
            .map(|a| {
                (
                    (
                        a.lms_section_source_system_identifier.clone(),
                        a.source_system_identifier.clone(),
                    ),
                    Vec::new(),
                )
            })
            .collect();
        for (synced, row) in submissions.iter().zip(rows) {
            by_assignment
                .entry((
                    synced.record.section_id.clone(),
                    row.assignment_source_system_identifier.clone(),
                ))
                .or_default()
                .push(row);
        }

        let total = by_assignment.values().map(Vec::len).sum();
        ctx.write(UdmEntity::Submissions, total, started, |w| {
            by_assignment
                .iter()
                .map(|((section, assignment), rows)| w.write_submissions(section, assignment, rows))
                .collect()
        });
        Ok(())
    }

    /// Authentication events of every user; the audit API is REST only
    async fn system_activities(&self, ctx: &mut Extraction, user_ids: &[String]) -> Result<()> {
        let started = ctx.start(UdmEntity::SystemActivities);
        let fetched = async {
            let mut events = Vec::new();
            for user_id in user_ids {
                events.extend(
                    self.api
                        .authentication_events(
                            user_id,
                            &self.options.start_date,
                            &self.options.end_date,
                        )
                        .await?,
                );
            }
            ctx.sync::<CanvasAuthenticationEvent>(
                &sync_resources::authentication_events(),
                events,
            )
            .await
        }
        .await;
        let Some(events) = ctx.settle(UdmEntity::SystemActivities, fetched)? else {
            return Ok(());
        };

        let activities = mapping::map_system_activities(&events);
        ctx.write(
            UdmEntity::SystemActivities,
            activities.len(),
            started,
            |w| w.write_system_activities(&activities),
        );
        Ok(())
    }
}

fn skip_below_sections(ctx: &mut Extraction) {
    let mut dependents = vec![UdmEntity::Users, UdmEntity::SectionAssociations];
    if ctx.wants(Feature::Grades) {
        dependents.push(UdmEntity::Grades);
    }
    if ctx.wants(Feature::Assignments) {
        dependents.extend([UdmEntity::Assignments, UdmEntity::Submissions]);
    }
    if ctx.wants(Feature::Activities) {
        dependents.push(UdmEntity::SystemActivities);
    }
    for entity in dependents {
        ctx.skip_dependent(entity, UdmEntity::Sections);
    }
}

/// Students enrolled in several courses are listed once per course
fn unique_by_id(records: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(scalar_to_string(&r["id"])))
        .collect()
}
