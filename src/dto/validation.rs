//! Validation helpers for DTOs.

use std::collections::HashSet;

use validator::{ValidateEmail, ValidationError, ValidationErrors};

use crate::dto::admin::QuestionInput;

/// Email must be well formed when given. A blank email is left to the registration rules.
pub fn validate_email_format(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() || email.validate_email() {
        return Ok(());
    }
    let mut err = ValidationError::new("email_invalid");
    err.message = Some(format!("`{email}` is not a valid email").into());
    Err(err)
}

/// Validates a single question definition.
///
/// Identifier and text must not be blank, and when choices are listed the expected
/// answer must name one of them.
pub fn validate_question(question: &QuestionInput) -> Result<(), ValidationError> {
    if question.id.trim().is_empty() {
        let mut err = ValidationError::new("question_id_required");
        err.message = Some("Question id must not be empty".into());
        return Err(err);
    }

    if question.text.trim().is_empty() {
        let mut err = ValidationError::new("question_text_required");
        err.message = Some(format!("Question `{}` has no text", question.id).into());
        return Err(err);
    }

    if let (Some(choices), Some(answer)) = (&question.choices, &question.answer)
        && !choices.iter().any(|choice| choice.id == *answer)
    {
        let mut err = ValidationError::new("question_answer_unknown");
        err.message = Some(
            format!(
                "Answer `{answer}` of question `{}` is not one of its choices",
                question.id
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that no two questions share an identifier.
pub fn validate_unique_question_ids(questions: &[QuestionInput]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for question in questions {
        if !seen.insert(question.id.trim()) {
            let mut err = ValidationError::new("question_id_duplicate");
            err.message = Some(format!("Duplicate question id `{}`", question.id).into());
            return Err(err);
        }
    }
    Ok(())
}

/// Validate a whole question list, collecting every failure under `field`.
pub fn validate_question_list(
    field: &'static str,
    questions: &[QuestionInput],
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    for question in questions {
        if let Err(err) = validate_question(question) {
            errors.add(field, err);
        }
    }
    if let Err(err) = validate_unique_question_ids(questions) {
        errors.add(field, err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::admin::ChoiceInput;

    fn question(id: &str, answer: Option<&str>) -> QuestionInput {
        QuestionInput {
            id: id.into(),
            text: "What?".into(),
            choices: Some(vec![
                ChoiceInput {
                    id: "a".into(),
                    text: "Alpha".into(),
                },
                ChoiceInput {
                    id: "b".into(),
                    text: "Beta".into(),
                },
            ]),
            answer: answer.map(Into::into),
            duration: 20,
            hint: None,
        }
    }

    #[test]
    fn accepts_well_formed_question() {
        assert!(validate_question(&question("q1", Some("b"))).is_ok());
        assert!(validate_question(&question("q1", None)).is_ok());
    }

    #[test]
    fn rejects_blank_fields() {
        assert!(validate_question(&question("  ", Some("a"))).is_err());
        let mut blank_text = question("q1", Some("a"));
        blank_text.text = " ".into();
        assert!(validate_question(&blank_text).is_err());
    }

    #[test]
    fn rejects_answer_outside_choices() {
        let err = validate_question(&question("q1", Some("z"))).unwrap_err();
        assert_eq!(err.code, "question_answer_unknown");
    }

    #[test]
    fn free_text_answers_need_no_choices() {
        let mut free = question("q1", Some("Paris"));
        free.choices = None;
        assert!(validate_question(&free).is_ok());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let list = vec![question("q1", None), question("q2", None), question("q1", None)];
        assert!(validate_unique_question_ids(&list).is_err());
        assert!(validate_question_list("questions", &list).is_err());
        assert!(validate_question_list("questions", &list[..2]).is_ok());
    }

    #[test]
    fn blank_email_is_left_to_registration() {
        assert!(validate_email_format("").is_ok());
        assert!(validate_email_format("ann@example.com").is_ok());
        assert_eq!(validate_email_format("ann").unwrap_err().code, "email_invalid");
    }
}
