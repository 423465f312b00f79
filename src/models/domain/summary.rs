use serde::Serialize;

/// Number of equal-width percentage bands in a score distribution.
pub const DISTRIBUTION_BANDS: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StudentQuizResult {
    pub quiz_id: String,
    pub course_id: String,
    pub score: i32,
    pub max_score: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StudentSummary {
    pub student_id: String,
    pub results: Vec<StudentQuizResult>,
    pub total_score: i64,
    pub total_max_score: i64,
    /// `None` when the student has no submitted attempts.
    pub average_percentage: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuizAggregate {
    pub quiz_id: String,
    pub title: String,
    pub max_score: i32,
    pub attempt_count: usize,
    pub mean: Option<f64>,
    pub min: Option<i32>,
    pub max: Option<i32>,
    /// Counts of submitted scores per 10% band of `max_score`; a full score
    /// lands in the last band.
    pub distribution: [usize; DISTRIBUTION_BANDS],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CourseAggregate {
    pub course_id: String,
    pub quizzes: Vec<QuizAggregate>,
}
