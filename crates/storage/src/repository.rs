use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use quiz_core::model::{
    AnswerRecord, Host, HostId, Player, PlayerId, Question, QuestionError, QuestionId,
    QuestionOption, Quiz, QuizId, QuizStatus, RoundId, RoundSummary,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//
// Persisted shapes mirror the domain types so repositories can serialize
// without leaking storage concerns into the domain layer. `New*` records
// carry everything except the row id, which the backend assigns.

#[derive(Debug, Clone)]
pub struct NewHostRecord {
    pub username: String,
    pub twitch_id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQuizRecord {
    pub host_id: HostId,
    pub title: String,
    pub description: Option<String>,
    pub status: QuizStatus,
    pub created_at: DateTime<Utc>,
}

impl NewQuizRecord {
    #[must_use]
    pub fn from_quiz(quiz: &Quiz) -> Self {
        Self {
            host_id: quiz.host_id(),
            title: quiz.title().to_owned(),
            description: quiz.description().map(str::to_owned),
            status: quiz.status(),
            created_at: quiz.created_at(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewQuestionRecord {
    pub quiz_id: QuizId,
    pub text: String,
    pub image_url: Option<String>,
    pub time_limit_secs: u32,
    pub order_index: u32,
    pub options: Vec<QuestionOption>,
    pub created_at: DateTime<Utc>,
}

impl NewQuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            quiz_id: question.quiz_id(),
            text: question.text().to_owned(),
            image_url: question.image_url().map(|u| u.as_str().to_owned()),
            time_limit_secs: question.time_limit_secs(),
            order_index: question.order_index(),
            options: question.options().to_vec(),
            created_at: question.created_at(),
        }
    }

    /// Hydrate into a domain `Question` under the id storage assigned.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the stored fields fail validation.
    pub fn into_question(self, id: QuestionId) -> Result<Question, QuestionError> {
        Question::from_persisted(
            id,
            self.quiz_id,
            self.text,
            self.image_url,
            self.time_limit_secs,
            self.order_index,
            self.options,
            self.created_at,
        )
    }
}

#[derive(Debug, Clone)]
pub struct NewPlayerRecord {
    pub quiz_id: QuizId,
    pub nickname: String,
}

//
// ─── REPOSITORY TRAITS ─────────────────────────────────────────────────────────
//

/// Quizmaster accounts keyed by their Twitch identity.
#[async_trait]
pub trait HostRepository: Send + Sync {
    /// Insert a new host and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the twitch id is already
    /// registered, or other storage errors.
    async fn insert_host(&self, record: NewHostRecord) -> Result<HostId, StorageError>;

    /// Fetch a host by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure; a missing row is `None`.
    async fn get_host(&self, id: HostId) -> Result<Option<Host>, StorageError>;

    /// Fetch a host by Twitch id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure; a missing row is `None`.
    async fn get_host_by_twitch_id(&self, twitch_id: &str) -> Result<Option<Host>, StorageError>;

    /// Record a completed login.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the host does not exist.
    async fn set_last_login(&self, id: HostId, at: DateTime<Utc>) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Insert a new quiz and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn insert_quiz(&self, record: NewQuizRecord) -> Result<QuizId, StorageError>;

    /// Fetch a quiz by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure; a missing row is `None`.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// All quizzes owned by a host, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the listing fails.
    async fn list_quizzes_for_host(&self, host_id: HostId) -> Result<Vec<Quiz>, StorageError>;

    /// Change a quiz's editorial status.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist.
    async fn set_quiz_status(&self, id: QuizId, status: QuizStatus) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Insert a new question and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` when the record fails domain
    /// validation, or other storage errors.
    async fn insert_question(&self, record: NewQuestionRecord)
    -> Result<QuestionId, StorageError>;

    /// All questions of a quiz, ordered by their order index.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the listing fails or a row is corrupt.
    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError>;
}

#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Insert a new player and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the nickname is already taken
    /// within the quiz, `StorageError::Serialization` when it fails domain
    /// validation, or other storage errors.
    async fn insert_player(&self, record: NewPlayerRecord) -> Result<PlayerId, StorageError>;

    /// All players registered for a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the listing fails.
    async fn list_players(&self, quiz_id: QuizId) -> Result<Vec<Player>, StorageError>;
}

/// Append-only log of accepted answer submissions.
#[async_trait]
pub trait AnswerLogRepository: Send + Sync {
    /// Append one accepted answer and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn append_answer(
        &self,
        round_id: RoundId,
        record: &AnswerRecord,
    ) -> Result<i64, StorageError>;

    /// All answers logged for a round, in submission order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the listing fails.
    async fn list_answers(&self, round_id: RoundId) -> Result<Vec<AnswerRecord>, StorageError>;
}

#[async_trait]
pub trait RoundSummaryRepository: Send + Sync {
    /// Append a finished-round summary and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the summary cannot be stored.
    async fn append_summary(&self, summary: &RoundSummary) -> Result<i64, StorageError>;

    /// Fetch a summary by row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_summary(&self, id: i64) -> Result<RoundSummary, StorageError>;

    /// Recent summaries for a quiz, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the listing fails.
    async fn list_summaries_for_quiz(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<RoundSummary>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    hosts: HashMap<HostId, Host>,
    quizzes: HashMap<QuizId, Quiz>,
    questions: HashMap<QuizId, Vec<Question>>,
    players: HashMap<QuizId, Vec<Player>>,
    answers: Vec<(i64, RoundId, AnswerRecord)>,
    summaries: Vec<(i64, RoundSummary)>,
    next_host_id: u64,
    next_quiz_id: u64,
    next_question_id: u64,
    next_player_id: u64,
    next_row_id: i64,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn invalid<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait]
impl HostRepository for InMemoryRepository {
    async fn insert_host(&self, record: NewHostRecord) -> Result<HostId, StorageError> {
        let mut state = self.lock()?;
        if state
            .hosts
            .values()
            .any(|h| h.twitch_id() == record.twitch_id)
        {
            return Err(StorageError::Conflict);
        }
        state.next_host_id += 1;
        let id = HostId::new(state.next_host_id);
        let host = Host::new(
            id,
            record.username,
            record.twitch_id,
            record.email,
            record.created_at,
            None,
        )
        .map_err(invalid)?;
        state.hosts.insert(id, host);
        Ok(id)
    }

    async fn get_host(&self, id: HostId) -> Result<Option<Host>, StorageError> {
        Ok(self.lock()?.hosts.get(&id).cloned())
    }

    async fn get_host_by_twitch_id(&self, twitch_id: &str) -> Result<Option<Host>, StorageError> {
        Ok(self
            .lock()?
            .hosts
            .values()
            .find(|h| h.twitch_id() == twitch_id)
            .cloned())
    }

    async fn set_last_login(&self, id: HostId, at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let host = state.hosts.get_mut(&id).ok_or(StorageError::NotFound)?;
        host.touch_login(at);
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn insert_quiz(&self, record: NewQuizRecord) -> Result<QuizId, StorageError> {
        let mut state = self.lock()?;
        state.next_quiz_id += 1;
        let id = QuizId::new(state.next_quiz_id);
        let quiz = Quiz::new(
            id,
            record.host_id,
            record.title,
            record.description,
            record.status,
            record.created_at,
        )
        .map_err(invalid)?;
        state.quizzes.insert(id, quiz);
        Ok(id)
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        Ok(self.lock()?.quizzes.get(&id).cloned())
    }

    async fn list_quizzes_for_host(&self, host_id: HostId) -> Result<Vec<Quiz>, StorageError> {
        let state = self.lock()?;
        let mut quizzes: Vec<Quiz> = state
            .quizzes
            .values()
            .filter(|q| q.host_id() == host_id)
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(&a.id())));
        Ok(quizzes)
    }

    async fn set_quiz_status(&self, id: QuizId, status: QuizStatus) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let quiz = state.quizzes.get_mut(&id).ok_or(StorageError::NotFound)?;
        if status == QuizStatus::Ready {
            quiz.publish();
        } else {
            let replacement = Quiz::new(
                quiz.id(),
                quiz.host_id(),
                quiz.title().to_owned(),
                quiz.description().map(str::to_owned),
                status,
                quiz.created_at(),
            )
            .map_err(invalid)?;
            *quiz = replacement;
        }
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(
        &self,
        record: NewQuestionRecord,
    ) -> Result<QuestionId, StorageError> {
        let mut state = self.lock()?;
        state.next_question_id += 1;
        let id = QuestionId::new(state.next_question_id);
        let quiz_id = record.quiz_id;
        let question = record.into_question(id).map_err(invalid)?;
        state.questions.entry(quiz_id).or_default().push(question);
        Ok(id)
    }

    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError> {
        let state = self.lock()?;
        let mut questions = state.questions.get(&quiz_id).cloned().unwrap_or_default();
        questions.sort_by_key(Question::order_index);
        Ok(questions)
    }
}

#[async_trait]
impl PlayerRepository for InMemoryRepository {
    async fn insert_player(&self, record: NewPlayerRecord) -> Result<PlayerId, StorageError> {
        let mut state = self.lock()?;
        let nickname = record.nickname.trim();
        if state
            .players
            .get(&record.quiz_id)
            .is_some_and(|ps| ps.iter().any(|p| p.nickname() == nickname))
        {
            return Err(StorageError::Conflict);
        }
        state.next_player_id += 1;
        let id = PlayerId::new(state.next_player_id);
        let player = Player::new(id, record.quiz_id, record.nickname).map_err(invalid)?;
        state.players.entry(record.quiz_id).or_default().push(player);
        Ok(id)
    }

    async fn list_players(&self, quiz_id: QuizId) -> Result<Vec<Player>, StorageError> {
        Ok(self.lock()?.players.get(&quiz_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl AnswerLogRepository for InMemoryRepository {
    async fn append_answer(
        &self,
        round_id: RoundId,
        record: &AnswerRecord,
    ) -> Result<i64, StorageError> {
        let mut state = self.lock()?;
        state.next_row_id += 1;
        let id = state.next_row_id;
        state.answers.push((id, round_id, record.clone()));
        Ok(id)
    }

    async fn list_answers(&self, round_id: RoundId) -> Result<Vec<AnswerRecord>, StorageError> {
        Ok(self
            .lock()?
            .answers
            .iter()
            .filter(|(_, rid, _)| *rid == round_id)
            .map(|(_, _, rec)| rec.clone())
            .collect())
    }
}

#[async_trait]
impl RoundSummaryRepository for InMemoryRepository {
    async fn append_summary(&self, summary: &RoundSummary) -> Result<i64, StorageError> {
        let mut state = self.lock()?;
        state.next_row_id += 1;
        let id = state.next_row_id;
        state.summaries.push((id, summary.clone()));
        Ok(id)
    }

    async fn get_summary(&self, id: i64) -> Result<RoundSummary, StorageError> {
        self.lock()?
            .summaries
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, s)| s.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_summaries_for_quiz(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<RoundSummary>, StorageError> {
        let state = self.lock()?;
        let mut summaries: Vec<RoundSummary> = state
            .summaries
            .iter()
            .rev()
            .filter(|(_, s)| s.quiz_id() == quiz_id)
            .map(|(_, s)| s.clone())
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();
        Ok(summaries)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Bundles the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub hosts: Arc<dyn HostRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub players: Arc<dyn PlayerRepository>,
    pub answers: Arc<dyn AnswerLogRepository>,
    pub summaries: Arc<dyn RoundSummaryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            hosts: Arc::new(repo.clone()),
            quizzes: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            players: Arc::new(repo.clone()),
            answers: Arc::new(repo.clone()),
            summaries: Arc::new(repo),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;

    fn new_question(quiz_id: QuizId, order: u32) -> NewQuestionRecord {
        NewQuestionRecord {
            quiz_id,
            text: format!("Question {order}?"),
            image_url: None,
            time_limit_secs: 30,
            order_index: order,
            options: vec![
                QuestionOption::new("right", true),
                QuestionOption::new("wrong", false),
            ],
            created_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn host_insert_and_lookup_roundtrip() {
        let repo = InMemoryRepository::new();
        let id = repo
            .insert_host(NewHostRecord {
                username: "streamer".into(),
                twitch_id: "t-1".into(),
                email: None,
                created_at: fixed_now(),
            })
            .await
            .unwrap();

        let by_id = repo.get_host(id).await.unwrap().unwrap();
        let by_twitch = repo.get_host_by_twitch_id("t-1").await.unwrap().unwrap();
        assert_eq!(by_id, by_twitch);
        assert_eq!(by_id.last_login(), None);

        repo.set_last_login(id, fixed_now()).await.unwrap();
        let host = repo.get_host(id).await.unwrap().unwrap();
        assert_eq!(host.last_login(), Some(fixed_now()));
    }

    #[tokio::test]
    async fn duplicate_twitch_id_conflicts() {
        let repo = InMemoryRepository::new();
        let record = NewHostRecord {
            username: "streamer".into(),
            twitch_id: "t-1".into(),
            email: None,
            created_at: fixed_now(),
        };
        repo.insert_host(record.clone()).await.unwrap();
        let err = repo.insert_host(record).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn questions_come_back_in_order() {
        let repo = InMemoryRepository::new();
        let quiz_id = QuizId::new(1);
        repo.insert_question(new_question(quiz_id, 2)).await.unwrap();
        repo.insert_question(new_question(quiz_id, 0)).await.unwrap();
        repo.insert_question(new_question(quiz_id, 1)).await.unwrap();

        let questions = repo.list_questions(quiz_id).await.unwrap();
        let orders: Vec<u32> = questions.iter().map(Question::order_index).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn duplicate_nickname_in_same_quiz_conflicts() {
        let repo = InMemoryRepository::new();
        let quiz_id = QuizId::new(1);
        repo.insert_player(NewPlayerRecord {
            quiz_id,
            nickname: "Alice".into(),
        })
        .await
        .unwrap();

        let err = repo
            .insert_player(NewPlayerRecord {
                quiz_id,
                nickname: "Alice".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        // Same nickname in a different quiz is fine.
        repo.insert_player(NewPlayerRecord {
            quiz_id: QuizId::new(2),
            nickname: "Alice".into(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn answers_are_scoped_to_their_round() {
        let repo = InMemoryRepository::new();
        let round_a = RoundId::generate();
        let round_b = RoundId::generate();
        let record = AnswerRecord::new(
            PlayerId::new(1),
            QuestionId::new(1),
            0,
            true,
            100,
            1,
            fixed_now(),
        );

        repo.append_answer(round_a, &record).await.unwrap();
        repo.append_answer(round_b, &record).await.unwrap();
        repo.append_answer(round_a, &record).await.unwrap();

        assert_eq!(repo.list_answers(round_a).await.unwrap().len(), 2);
        assert_eq!(repo.list_answers(round_b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn summary_roundtrip() {
        let repo = InMemoryRepository::new();
        let summary = RoundSummary::from_persisted(
            QuizId::new(1),
            RoundId::generate(),
            fixed_now(),
            fixed_now(),
            2,
            3,
            2,
            1,
        )
        .unwrap();

        let id = repo.append_summary(&summary).await.unwrap();
        let fetched = repo.get_summary(id).await.unwrap();
        assert_eq!(fetched, summary);

        let listed = repo
            .list_summaries_for_quiz(QuizId::new(1), 10)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }
}
