use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{
    auth::{authorize, Action, Relation},
    errors::{AppError, AppResult},
    models::domain::{
        summary::DISTRIBUTION_BANDS, AttemptStatus, CourseAggregate, Principal, Quiz,
        QuizAggregate, QuizAttempt, StudentQuizResult, StudentSummary,
    },
    repositories::{AttemptRepository, CourseRepository, EnrollmentRepository, QuizRepository},
    services::{course_relation, with_timeout},
};

/// Builds a student's summary from their attempts. Only submitted attempts
/// count.
pub fn summarize_student(student_id: &str, attempts: &[QuizAttempt]) -> StudentSummary {
    let results: Vec<StudentQuizResult> = attempts
        .iter()
        .filter(|a| a.status == AttemptStatus::Submitted)
        .filter_map(|a| {
            a.score.map(|score| StudentQuizResult {
                quiz_id: a.quiz_id.clone(),
                course_id: a.course_id.clone(),
                score,
                max_score: a.max_score,
            })
        })
        .collect();

    let total_score: i64 = results.iter().map(|r| i64::from(r.score)).sum();
    let total_max_score: i64 = results.iter().map(|r| i64::from(r.max_score)).sum();
    let average_percentage = (total_max_score > 0)
        .then(|| total_score as f64 / total_max_score as f64 * 100.0);

    StudentSummary {
        student_id: student_id.to_string(),
        results,
        total_score,
        total_max_score,
        average_percentage,
    }
}

fn band_for(score: i32, max_score: i32) -> usize {
    if max_score <= 0 {
        return 0;
    }
    let band = (i64::from(score.max(0)) * DISTRIBUTION_BANDS as i64 / i64::from(max_score)) as usize;
    band.min(DISTRIBUTION_BANDS - 1)
}

/// Statistics over the given scores for one quiz. No scores yields a zero
/// count and no mean, min or max.
pub fn aggregate_quiz(quiz: &Quiz, scores: &[i32]) -> QuizAggregate {
    let max_score = quiz.max_score();
    let mut distribution = [0usize; DISTRIBUTION_BANDS];
    for score in scores {
        distribution[band_for(*score, max_score)] += 1;
    }

    let mean = (!scores.is_empty())
        .then(|| scores.iter().map(|s| f64::from(*s)).sum::<f64>() / scores.len() as f64);

    QuizAggregate {
        quiz_id: quiz.id.clone(),
        title: quiz.title.clone(),
        max_score,
        attempt_count: scores.len(),
        mean,
        min: scores.iter().copied().min(),
        max: scores.iter().copied().max(),
        distribution,
    }
}

pub fn aggregate_course(course_id: &str, quizzes: &[Quiz], attempts: &[QuizAttempt]) -> CourseAggregate {
    let mut scores: HashMap<&str, Vec<i32>> = HashMap::new();
    for attempt in attempts
        .iter()
        .filter(|a| a.status == AttemptStatus::Submitted)
    {
        if let Some(score) = attempt.score {
            scores.entry(attempt.quiz_id.as_str()).or_default().push(score);
        }
    }

    CourseAggregate {
        course_id: course_id.to_string(),
        quizzes: quizzes
            .iter()
            .map(|quiz| {
                let quiz_scores = scores.get(quiz.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
                aggregate_quiz(quiz, quiz_scores)
            })
            .collect(),
    }
}

pub struct ResultService {
    attempts: Arc<dyn AttemptRepository>,
    quizzes: Arc<dyn QuizRepository>,
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    timeout: Duration,
}

impl ResultService {
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        quizzes: Arc<dyn QuizRepository>,
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        timeout: Duration,
    ) -> Self {
        Self {
            attempts,
            quizzes,
            courses,
            enrollments,
            timeout,
        }
    }

    pub async fn student_summary(
        &self,
        caller: &Principal,
        student_id: &str,
    ) -> AppResult<StudentSummary> {
        let relation = if caller.id == student_id {
            Relation::Owner
        } else {
            Relation::Unrelated
        };
        authorize(caller, Action::ViewStudentSummary, relation)?;

        let attempts = with_timeout(self.timeout, self.attempts.list_by_student(student_id)).await?;
        Ok(summarize_student(student_id, &attempts))
    }

    /// Read-only: attempts are never transitioned here.
    pub async fn course_aggregate(
        &self,
        caller: &Principal,
        course_id: &str,
    ) -> AppResult<CourseAggregate> {
        let course = with_timeout(self.timeout, self.courses.find_by_id(course_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course with id '{}' not found", course_id)))?;
        let relation =
            course_relation(self.enrollments.as_ref(), self.timeout, caller, &course).await?;
        authorize(caller, Action::ViewCourseAggregate, relation)?;

        let course_ids = [course.id.clone()];
        let quizzes = with_timeout(self.timeout, self.quizzes.list_by_courses(&course_ids)).await?;
        let attempts = with_timeout(
            self.timeout,
            self.attempts.list_submitted_by_course(&course.id),
        )
        .await?;

        Ok(aggregate_course(&course.id, &quizzes, &attempts))
    }
}
