//! Prompt templates. Plain string formatting; every structured reply is
//! requested as a single JSON object so `extract_json` can read it.

use crate::writing::{LetterKind, RewriteGoal};
use grantcraft_core::{MechanismId, SectionType};

pub const REVIEWER_SYSTEM: &str = "You are an experienced NIH study section reviewer. \
You score applications on the NIH 1-9 scale where 1 is exceptional and 9 is poor. \
You are specific, fair and concise, and you always answer in the requested JSON format.";

pub const WRITER_SYSTEM: &str = "You are a grant writing consultant who helps scientists \
prepare NIH, SBIR and STTR applications. Write in clear, confident scientific prose.";

pub fn critique(text: &str, section_type: SectionType, mechanism: MechanismId) -> String {
    format!(
        "Critique the following {section} from a {mechanism} application as a study section reviewer would.\n\n\
Return JSON only, with this shape:\n\
{{\"score\": <integer 1-9>, \"strengths\": [<string>], \"weaknesses\": [<string>], \
\"suggestions\": [<string>], \"summary\": <string>}}\n\n\
--- {section} ---\n{text}\n--- end ---",
        section = section_type.title(),
        mechanism = mechanism,
        text = text.trim(),
    )
}

pub fn hypotheses(topic: &str, background: &str, count: usize) -> String {
    let background = if background.trim().is_empty() {
        "(none provided)"
    } else {
        background.trim()
    };
    format!(
        "Propose {count} distinct, testable, falsifiable central hypotheses for an NIH application.\n\
Topic: {topic}\nBackground: {background}\n\n\
Each hypothesis must be one sentence naming the mechanism and the measurable outcome.\n\
Return JSON only: {{\"hypotheses\": [<string>, ...]}}",
        count = count,
        topic = topic.trim(),
        background = background,
    )
}

pub fn letter(kind: LetterKind, details: &str) -> String {
    let purpose = match kind {
        LetterKind::Support => {
            "a letter of support from a collaborator or stakeholder endorsing the project"
        }
        LetterKind::Collaboration => {
            "a letter of collaboration describing the collaborator's specific role and resources"
        }
        LetterKind::Commitment => {
            "a letter of commitment confirming institutional or commercial resources for the project"
        }
    };
    format!(
        "Draft {purpose}. Use formal letter format with placeholders in square brackets for \
names and signatures that are not given. Keep it to one page.\n\nDetails:\n{details}",
        purpose = purpose,
        details = details.trim(),
    )
}

pub fn rewrite(text: &str, goal: RewriteGoal) -> String {
    let instruction = match goal {
        RewriteGoal::Clarity => "Rewrite for clarity. Keep every scientific claim and citation.",
        RewriteGoal::Concise => {
            "Rewrite to be as concise as possible without losing content; aim for about 30% fewer words."
        }
        RewriteGoal::Persuasive => {
            "Rewrite to be more persuasive to reviewers: lead with significance and state the impact explicitly."
        }
        RewriteGoal::LayAudience => {
            "Rewrite for a lay audience at about an eighth-grade reading level, avoiding jargon."
        }
    };
    format!(
        "{instruction}\nReturn only the rewritten text.\n\n---\n{text}\n---",
        instruction = instruction,
        text = text.trim(),
    )
}

pub fn public_summary(text: &str) -> String {
    format!(
        "Write an NIH Project Narrative for the research below: no more than three sentences, \
in plain language, describing its relevance to public health. Return only the narrative.\n\n---\n{}\n---",
        text.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critique_prompt_names_section_and_mechanism() {
        let prompt = critique("  Aim 1 text ", SectionType::SpecificAims, MechanismId::R21);
        assert!(prompt.contains("Specific Aims"));
        assert!(prompt.contains("R21"));
        assert!(prompt.contains("\"score\""));
        assert!(prompt.contains("\nAim 1 text\n"));
    }

    #[test]
    fn hypotheses_prompt_handles_missing_background() {
        let prompt = hypotheses("cardiac aging", " ", 3);
        assert!(prompt.contains("Propose 3"));
        assert!(prompt.contains("(none provided)"));
    }
}
