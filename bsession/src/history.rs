//! Bounded per-session conversation history.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use bdispatch::Message;

/// One completed exchange: the user's question and every message produced
/// answering it. A plain round has a single assistant answer; a tool round
/// has the assistant-with-calls message, one tool result per call, and the
/// final assistant message.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub question: Message,
    pub answers: Vec<Message>,
}

impl Turn {
    pub fn new(question: Message, answers: Vec<Message>) -> Self {
        Self { question, answers }
    }
}

/// Ordered turn buffer with FIFO eviction at `max_turns`. The bound is
/// enforced inside `append` under the same lock, so a snapshot can never
/// observe more than `max_turns` turns.
#[derive(Debug)]
pub struct ConversationHistory {
    system_prompt: Option<String>,
    max_turns: usize,
    turns: Mutex<VecDeque<Turn>>,
}

impl ConversationHistory {
    pub fn new(system_prompt: Option<String>, max_turns: usize) -> Self {
        Self {
            system_prompt,
            max_turns: max_turns.max(1),
            turns: Mutex::new(VecDeque::new()),
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Appends a completed turn, evicting the oldest turns first once the
    /// buffer is full. The system prompt is not a turn and is never evicted.
    pub fn append(&self, turn: Turn) {
        let mut turns = self.lock_turns();
        while turns.len() >= self.max_turns {
            turns.pop_front();
        }
        turns.push_back(turn);
    }

    /// Returns the flattened message list sent to the backend: the system
    /// prompt first (when configured), then each retained turn's question
    /// and answers in chronological order. The copy is defensive; later
    /// appends do not affect it.
    pub fn snapshot(&self) -> Vec<Message> {
        let turns = self.lock_turns();

        let mut messages = Vec::new();
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt.clone()));
        }
        for turn in turns.iter() {
            messages.push(turn.question.clone());
            messages.extend(turn.answers.iter().cloned());
        }

        messages
    }

    pub fn len(&self) -> usize {
        self.lock_turns().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_turns().is_empty()
    }

    fn lock_turns(&self) -> MutexGuard<'_, VecDeque<Turn>> {
        self.turns.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_turn(index: usize) -> Turn {
        Turn::new(
            Message::user(format!("question {index}")),
            vec![Message::assistant(format!("answer {index}"))],
        )
    }

    #[test]
    fn length_is_bounded_by_max_turns() {
        let history = ConversationHistory::new(None, 3);
        for index in 0..7 {
            history.append(plain_turn(index));
        }

        assert_eq!(history.len(), 3);
    }

    #[test]
    fn eviction_is_strictly_fifo() {
        let history = ConversationHistory::new(None, 2);
        for index in 0..4 {
            history.append(plain_turn(index));
        }

        let messages = history.snapshot();
        assert_eq!(messages[0].text(), "question 2");
        assert_eq!(messages[2].text(), "question 3");
    }

    #[test]
    fn snapshot_puts_system_prompt_first() {
        let history = ConversationHistory::new(Some("be brief".to_string()), 5);
        history.append(plain_turn(0));
        history.append(plain_turn(1));

        let messages = history.snapshot();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0], Message::system("be brief"));
        assert_eq!(messages[1].text(), "question 0");
        assert_eq!(messages[4].text(), "answer 1");
    }

    #[test]
    fn tool_round_turn_flattens_every_answer() {
        let history = ConversationHistory::new(Some("be brief".to_string()), 5);
        history.append(Turn::new(
            Message::user("weather?"),
            vec![
                Message::assistant_with_calls(None, Vec::new()),
                Message::tool_result("call_1", "{\"temp\":\"27\"}"),
                Message::assistant("27 degrees"),
            ],
        ));

        // 1 system + (1 question + 3 answers)
        assert_eq!(history.snapshot().len(), 5);
    }

    #[test]
    fn empty_history_yields_only_the_system_prompt() {
        let with_prompt = ConversationHistory::new(Some("be brief".to_string()), 5);
        assert_eq!(with_prompt.snapshot().len(), 1);

        let without_prompt = ConversationHistory::new(None, 5);
        assert!(without_prompt.snapshot().is_empty());
    }

    #[test]
    fn snapshot_is_a_defensive_copy() {
        let history = ConversationHistory::new(None, 5);
        history.append(plain_turn(0));

        let before = history.snapshot();
        history.append(plain_turn(1));

        assert_eq!(before.len(), 2);
        assert_eq!(history.snapshot().len(), 4);
    }

    #[test]
    fn zero_max_turns_is_clamped_to_one() {
        let history = ConversationHistory::new(None, 0);
        history.append(plain_turn(0));
        history.append(plain_turn(1));

        assert_eq!(history.len(), 1);
        assert_eq!(history.snapshot()[0].text(), "question 1");
    }
}
