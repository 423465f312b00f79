use std::{collections::BTreeMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

use crate::{
    auth::{authorize, Action, Relation},
    clock::Clock,
    errors::{AppError, AppResult},
    models::{
        domain::{AttemptStatus, Principal, Quiz, QuizAttempt, ScheduleState},
        dto::response::{QuestionFeedback, SubmissionResult},
    },
    repositories::{AttemptRepository, CourseRepository, EnrollmentRepository, QuizRepository},
    services::{course_relation, with_timeout},
};

/// Scores `answers` against the quiz's answer key.
///
/// A question earns its weight only when the chosen option is the correct
/// one. Unanswered questions and answers to unknown question ids earn
/// nothing.
pub fn grade(quiz: &Quiz, answers: &BTreeMap<String, String>) -> (i32, Vec<QuestionFeedback>) {
    let feedback: Vec<QuestionFeedback> = quiz
        .questions
        .iter()
        .map(|question| {
            let selected = answers.get(&question.id);
            let is_correct = selected.is_some_and(|option| question.is_correct(option));

            QuestionFeedback {
                question_id: question.id.clone(),
                prompt: question.prompt.clone(),
                selected_option_id: selected.cloned(),
                selected_option_text: selected
                    .and_then(|option| question.option_text(option))
                    .map(str::to_string),
                correct_option_id: question.correct_option_id.clone(),
                correct_option_text: question
                    .option_text(&question.correct_option_id)
                    .map(str::to_string),
                is_correct,
                points_earned: if is_correct { question.weight } else { 0 },
            }
        })
        .collect();

    let score = feedback
        .iter()
        .fold(0i32, |total, f| total.saturating_add(f.points_earned));
    (score, feedback)
}

pub struct AttemptService {
    attempts: Arc<dyn AttemptRepository>,
    quizzes: Arc<dyn QuizRepository>,
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl AttemptService {
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        quizzes: Arc<dyn QuizRepository>,
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            attempts,
            quizzes,
            courses,
            enrollments,
            clock,
            timeout,
        }
    }

    async fn find_quiz(&self, id: &str) -> AppResult<Quiz> {
        with_timeout(self.timeout, self.quizzes.find_by_id(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", id)))
    }

    async fn find_attempt(&self, id: &str) -> AppResult<QuizAttempt> {
        with_timeout(self.timeout, self.attempts.find_by_id(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt with id '{}' not found", id)))
    }

    /// Moves an overdue attempt to Expired before it is handed out.
    async fn expire_if_overdue(
        &self,
        attempt: QuizAttempt,
        now: DateTime<Utc>,
    ) -> AppResult<QuizAttempt> {
        if !attempt.is_overdue(now) {
            return Ok(attempt);
        }

        match with_timeout(self.timeout, self.attempts.expire(&attempt.id)).await? {
            Some(expired) => {
                log::info!(
                    "Attempt {} by {} expired at deadline {}",
                    expired.id,
                    expired.student_id,
                    expired.deadline
                );
                Ok(expired)
            }
            // Another request finalized it first; return what is stored now.
            None => self.find_attempt(&attempt.id).await,
        }
    }

    async fn attempt_relation(
        &self,
        caller: &Principal,
        attempt: &QuizAttempt,
    ) -> AppResult<Relation> {
        if caller.is_student() {
            return Ok(if attempt.student_id == caller.id {
                Relation::Owner
            } else {
                Relation::Unrelated
            });
        }

        let course = with_timeout(self.timeout, self.courses.find_by_id(&attempt.course_id))
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Course with id '{}' not found", attempt.course_id))
            })?;
        course_relation(self.enrollments.as_ref(), self.timeout, caller, &course).await
    }

    /// Opens an attempt for the calling student and locks the quiz against
    /// edits. Returns the attempt with the quiz it belongs to.
    pub async fn start_attempt(
        &self,
        caller: &Principal,
        quiz_id: &str,
    ) -> AppResult<(QuizAttempt, Quiz)> {
        authorize(caller, Action::StartAttempt, Relation::Unrelated)?;

        let quiz = self.find_quiz(quiz_id).await?;

        let enrolled = with_timeout(
            self.timeout,
            self.enrollments.is_enrolled(&quiz.course_id, &caller.id),
        )
        .await?;
        if !enrolled {
            return Err(AppError::NotEnrolled(format!(
                "You are not enrolled in the course for quiz '{}'",
                quiz.title
            )));
        }

        if !quiz.is_active {
            return Err(AppError::Closed(format!(
                "Quiz '{}' is not active",
                quiz.title
            )));
        }

        let now = self.clock.now();
        match quiz.schedule_state(now) {
            ScheduleState::NotYetOpen => {
                return Err(AppError::NotYetOpen(format!(
                    "Quiz '{}' opens at {}",
                    quiz.title, quiz.opens_at
                )))
            }
            ScheduleState::Closed => {
                return Err(AppError::Closed(format!(
                    "Quiz '{}' closed at {}",
                    quiz.title, quiz.closes_at
                )))
            }
            ScheduleState::Open => {}
        }

        if let Some(existing) =
            with_timeout(self.timeout, self.attempts.find_active(&quiz.id, &caller.id)).await?
        {
            let existing = self.expire_if_overdue(existing, now).await?;
            if existing.active {
                return Err(AppError::AlreadyAttempted(format!(
                    "You have already attempted quiz '{}'",
                    quiz.title
                )));
            }
        }

        with_timeout(self.timeout, self.quizzes.lock(&quiz.id)).await?;

        let attempt = QuizAttempt::start(
            &quiz.id,
            &quiz.course_id,
            &caller.id,
            quiz.max_score(),
            now,
            quiz.deadline_for(now),
        );
        let attempt = with_timeout(self.timeout, self.attempts.insert_active(attempt)).await?;

        log::info!(
            "Student {} started attempt {} on quiz {} (deadline {})",
            caller.id,
            attempt.id,
            quiz.id,
            attempt.deadline
        );
        Ok((attempt, quiz))
    }

    /// Grades and finalizes an in-progress attempt in one conditional write.
    pub async fn submit_answers(
        &self,
        caller: &Principal,
        attempt_id: &str,
        answers: BTreeMap<String, String>,
    ) -> AppResult<SubmissionResult> {
        let attempt = self.find_attempt(attempt_id).await?;
        let relation = if attempt.student_id == caller.id {
            Relation::Owner
        } else {
            Relation::Unrelated
        };
        authorize(caller, Action::SubmitAttempt, relation)?;

        let finalized = || {
            AppError::AlreadyFinalized(format!("Attempt '{}' is no longer in progress", attempt_id))
        };

        if attempt.status != AttemptStatus::InProgress {
            return Err(finalized());
        }

        let now = self.clock.now();
        if now >= attempt.deadline {
            self.expire_if_overdue(attempt, now).await?;
            return Err(AppError::Closed(format!(
                "The deadline for attempt '{}' has passed",
                attempt_id
            )));
        }

        let quiz = self.find_quiz(&attempt.quiz_id).await?;
        let (score, feedback) = grade(&quiz, &answers);

        let submitted = with_timeout(
            self.timeout,
            self.attempts.submit(attempt_id, answers, score, now),
        )
        .await?
        .ok_or_else(finalized)?;

        log::info!(
            "Student {} submitted attempt {} scoring {}/{}",
            caller.id,
            submitted.id,
            score,
            submitted.max_score
        );

        Ok(SubmissionResult {
            attempt_id: submitted.id,
            quiz_id: submitted.quiz_id,
            status: submitted.status,
            score,
            max_score: submitted.max_score,
            submitted_at: now,
            feedback,
        })
    }

    pub async fn get_attempt(&self, caller: &Principal, attempt_id: &str) -> AppResult<QuizAttempt> {
        let attempt = self.find_attempt(attempt_id).await?;
        let relation = self.attempt_relation(caller, &attempt).await?;
        authorize(caller, Action::ViewAttempt, relation)?;

        self.expire_if_overdue(attempt, self.clock.now()).await
    }

    pub async fn list_quiz_attempts(
        &self,
        caller: &Principal,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>> {
        let quiz = self.find_quiz(quiz_id).await?;
        let course = with_timeout(self.timeout, self.courses.find_by_id(&quiz.course_id))
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Course with id '{}' not found", quiz.course_id))
            })?;
        let relation =
            course_relation(self.enrollments.as_ref(), self.timeout, caller, &course).await?;
        authorize(caller, Action::ListQuizAttempts, relation)?;

        let attempts = with_timeout(self.timeout, self.attempts.list_by_quiz(&quiz.id)).await?;
        self.expire_all(attempts).await
    }

    pub async fn my_attempts(&self, caller: &Principal) -> AppResult<Vec<QuizAttempt>> {
        if !caller.is_student() {
            return Err(AppError::PermissionDenied(
                "Only students have attempts".to_string(),
            ));
        }

        let attempts = with_timeout(self.timeout, self.attempts.list_by_student(&caller.id)).await?;
        self.expire_all(attempts).await
    }

    async fn expire_all(&self, attempts: Vec<QuizAttempt>) -> AppResult<Vec<QuizAttempt>> {
        let now = self.clock.now();
        let mut refreshed = Vec::with_capacity(attempts.len());
        for attempt in attempts {
            refreshed.push(self.expire_if_overdue(attempt, now).await?);
        }
        Ok(refreshed)
    }
}
