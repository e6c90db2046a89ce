use quizlens::answers::AnswerLog;
use quizlens::models::{QuizQuestion, QuizResult};

fn question(number: &str, answer: &str) -> QuizQuestion {
    QuizQuestion {
        number: number.into(),
        question: "q".into(),
        answer: answer.into(),
    }
}

#[test]
fn record_appends_tokens_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let log = AnswerLog::load(dir.path().join("answers.txt"));

    log.record(&QuizResult::new(vec![question("1", "A"), question("2", "B")]));
    log.record(&QuizResult::new(vec![question("3", "True")]));

    assert_eq!(log.entries(), vec!["1A", "2B", "3True"]);
}

#[test]
fn answers_survive_a_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("answers.txt");

    let log = AnswerLog::load(&path);
    log.record(&QuizResult::new(vec![question("7", "C")]));
    drop(log);

    let reloaded = AnswerLog::load(&path);
    assert_eq!(reloaded.entries(), vec!["7C"]);
}

#[test]
fn file_is_space_joined_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("answers.txt");

    let log = AnswerLog::load(&path);
    log.record(&QuizResult::new(vec![
        question("1", "A"),
        question("2", "B"),
        question("3", "C"),
    ]));

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "1A 2B 3C");
}

#[test]
fn blank_answers_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let log = AnswerLog::load(dir.path().join("answers.txt"));

    log.record(&QuizResult::new(vec![
        question("1", "A"),
        question("2", "  "),
        question("3", "B"),
    ]));

    assert_eq!(log.entries(), vec!["1A", "3B"]);
}

#[test]
fn reset_deletes_file_and_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("answers.txt");

    let log = AnswerLog::load(&path);
    log.record(&QuizResult::new(vec![question("1", "A"), question("2", "B")]));
    assert!(path.exists());

    assert_eq!(log.reset(), 2);
    assert!(log.is_empty());
    assert!(!path.exists());
}

#[test]
fn format_display_chunks_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let log = AnswerLog::load(dir.path().join("answers.txt"));

    let questions: Vec<QuizQuestion> = (1..=5)
        .map(|n| question(&n.to_string(), "A"))
        .collect();
    log.record(&QuizResult::new(questions));

    assert_eq!(log.format_display(2), "1A 2A\n3A 4A\n5A");
    assert_eq!(log.format_display(10), "1A 2A 3A 4A 5A");
    // Zero is clamped rather than panicking.
    assert_eq!(log.format_display(0), "1A\n2A\n3A\n4A\n5A");
}

#[test]
fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let log = AnswerLog::load(dir.path().join("absent.txt"));
    assert!(log.is_empty());
    assert_eq!(log.len(), 0);
}
