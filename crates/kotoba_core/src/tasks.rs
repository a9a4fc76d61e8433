//! Oracle task layer: prompt construction, response parsing, validation.
//!
//! The oracle may hallucinate answers outside the option set; every task
//! here validates the response against the options it offered and, where a
//! retry budget applies, re-prompts with error feedback naming the previous
//! answer. Exhaustion degrades to an empty result (the question is skipped),
//! never an error.

use crate::oracle::{Oracle, OracleError};
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are a precise translation assistant.";

/// Token delimiter in oracle list responses.
const DELIMITER: char = '#';

/// Split a delimiter-separated oracle response into tokens.
fn parse_token_list(response: &str) -> Vec<String> {
    response
        .trim()
        .trim_end_matches(DELIMITER)
        .split(DELIMITER)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn arrange_prompt(sentence: &str, options: &[String]) -> String {
    format!(
        "Task:\n\
         From the given options, select and reorder the substrings to form a coherent \
         translation of the source sentence according to the target language's linguistic \
         conventions. You may not need to use all the provided substrings.\n\
         Rules:\n\
         1. Use ONLY the provided substrings. It's not mandatory to use all of them.\n\
         2. Each substring can be used only as many times as it appears in the list.\n\
         3. The translation should accurately reflect the original sentence's meaning.\n\
         4. Output the result as a single string with substrings separated by '#'. \
         Do not include any punctuation marks.\n\
         5. Strictly follow the output format and do not include any additional content, \
         explanations, or punctuation marks.\n\
         6. Output format: substringA#substringB#substringC#...\n\
         Original sentence: \"{}\"\n\
         Substrings to use: {}\n\
         Return ONLY the hash-separated string as your response.",
        sentence,
        options.join(", ")
    )
}

fn order_prompt(originals: &[String], options: &[String]) -> String {
    format!(
        "Given a list of original words and a list of options containing semantically \
         related words or translations in a mixed order, sort the options to match the \
         semantic order of the original words. Return only the sorted list of options \
         separated by a hash (#) symbol. Do not include the original words list, any \
         explanations, or additional content. Here are the lists:\n\n\
         Original words:\n{}\n\nOptions (mixed order):\n{}",
        originals
            .iter()
            .map(|w| format!("- {}", w))
            .collect::<Vec<_>>()
            .join("\n"),
        options
            .iter()
            .map(|o| format!("- {}", o))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Ask the oracle to translate `sentence` as an ordered selection of
/// `options`. Bounded retries with corrective feedback; empty on exhaustion
/// or transport failure.
pub fn arrange_tokens(
    oracle: &dyn Oracle,
    sentence: &str,
    options: &[String],
    max_attempts: usize,
) -> Vec<String> {
    let mut prompt = arrange_prompt(sentence, options);

    for attempt in 1..=max_attempts {
        let response = match oracle.complete(SYSTEM_PROMPT, &prompt) {
            Ok(r) => r,
            Err(e) => {
                // Transport failure is not recoverable by re-prompting.
                warn!(error = %e, "Oracle unavailable, skipping question");
                return Vec::new();
            }
        };
        debug!(attempt, %response, "Oracle arrangement attempt");

        let tokens = parse_token_list(&response);
        let offenders: Vec<&String> = tokens.iter().filter(|t| !options.contains(t)).collect();

        if offenders.is_empty() && !tokens.is_empty() {
            return tokens;
        }

        let offending = offenders
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        prompt.push_str(&format!(
            "\n\nPrevious attempt: {}\nError: these substrings were not in the provided \
             list: [{}]. Please try again using ONLY the given substrings.",
            response, offending
        ));
    }

    warn!(
        sentence,
        max_attempts, "Oracle could not arrange tokens within the attempt budget"
    );
    Vec::new()
}

/// Ask the oracle to pick the option semantically matching `word`.
///
/// Single attempt; an answer outside `options` is a hard error.
pub fn pick_matching_word(
    oracle: &dyn Oracle,
    word: &str,
    options: &[String],
) -> Result<String, OracleError> {
    let formatted_options = options
        .iter()
        .map(|o| format!("- {}", o))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = format!(
        "Find the word that semantically matches or is closely related to '{}' from the \
         options listed below.\n\
         This may involve finding synonyms, related concepts, or the correct translation \
         if applicable.\n{}\n\
         Respond with only the selected option. Do not include any additional text or \
         explanation.",
        word, formatted_options
    );

    let answer = oracle.complete(SYSTEM_PROMPT, &prompt)?;
    let answer = answer.trim().to_string();

    if options.contains(&answer) {
        Ok(answer)
    } else {
        Err(OracleError::OutOfOptions(answer))
    }
}

/// Ask the oracle to reorder `options` into the semantic order of
/// `originals`. The result must be a full permutation drawn from the option
/// list; bounded retries, empty on exhaustion or transport failure.
pub fn order_pairs(
    oracle: &dyn Oracle,
    originals: &[String],
    options: &[String],
    max_attempts: usize,
) -> Vec<String> {
    let mut prompt = order_prompt(originals, options);

    for attempt in 1..=max_attempts {
        let response = match oracle.complete(SYSTEM_PROMPT, &prompt) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Oracle unavailable, skipping pair ordering");
                return Vec::new();
            }
        };
        debug!(attempt, %response, "Oracle ordering attempt");

        let tokens = parse_token_list(&response);
        let all_known = tokens.iter().all(|t| options.contains(t));

        if all_known && tokens.len() == originals.len() {
            return tokens;
        }

        prompt.push_str(&format!(
            "\n\nPrevious attempt: {}\nError: the answer must contain exactly {} options, \
             each drawn from the options list, separated by '#'. Please try again.",
            response,
            originals.len()
        ));
    }

    warn!(max_attempts, "Oracle could not order pairs within the attempt budget");
    Vec::new()
}
