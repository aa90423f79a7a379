//! Plain-text bodies for the emails the pipeline sends.

use crate::domains::jobs::ImprovedItem;

pub const FAILURE_SUBJECT: &str = "Request Failed for Youtube Title Doctor";

pub const FAILURE_BODY: &str = "We ran into a problem while processing your request \
and could not finish improving your titles.\n\n\
Please check the channel name and try again later.\n\n\
YouTube Title Doctor";

const RULE_WIDTH: usize = 50;
const ITEM_RULE_WIDTH: usize = 30;

pub fn success_subject(display_name: &str) -> String {
    format!("Your Improved YouTube Titles for {display_name}")
}

pub fn success_body(display_name: &str, items: &[ImprovedItem]) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let item_rule = "-".repeat(ITEM_RULE_WIDTH);
    let mut body = format!("YouTube Title Doctor - Improved Titles for {display_name}\n{rule}\n\n");

    for (index, item) in items.iter().enumerate() {
        body.push_str(&format!("Video {}:\n{item_rule}\n", index + 1));
        body.push_str(&format!("Original Title: {}\n", item.original));
        body.push_str(&format!("Improved Title: {}\n", item.improved));
        body.push_str(&format!("Why: {}\n", item.rationale));
        body.push_str(&format!("Link: {}\n\n", item.url));
    }

    body.push_str(&rule);
    body.push('\n');
    body.push_str("Thanks for using YouTube Title Doctor!\n");
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: usize) -> ImprovedItem {
        ImprovedItem {
            original: format!("Video {n}"),
            improved: format!("Improved: Video {n}"),
            rationale: "More specific".to_string(),
            url: format!("https://www.youtube.com/watch?v=vid{n}"),
        }
    }

    #[test]
    fn body_lists_every_pair_in_order() {
        let body = success_body("Acme Channel", &[item(1), item(2)]);

        assert!(body.starts_with("YouTube Title Doctor - Improved Titles for Acme Channel\n"));
        let first = body.find("Video 1:").unwrap();
        let second = body.find("Video 2:").unwrap();
        assert!(first < second);
        assert!(body.contains("Original Title: Video 2\nImproved Title: Improved: Video 2\n"));
        assert!(body.contains("Why: More specific"));
        assert!(body.contains("Link: https://www.youtube.com/watch?v=vid1"));
    }

    #[test]
    fn body_layout_matches_the_plain_text_report() {
        let body = success_body("Acme", &[item(1)]);
        let rule = "=".repeat(50);
        let item_rule = "-".repeat(30);

        let expected = format!(
            "YouTube Title Doctor - Improved Titles for Acme\n{rule}\n\n\
             Video 1:\n{item_rule}\n\
             Original Title: Video 1\n\
             Improved Title: Improved: Video 1\n\
             Why: More specific\n\
             Link: https://www.youtube.com/watch?v=vid1\n\n\
             {rule}\n\
             Thanks for using YouTube Title Doctor!\n"
        );
        assert_eq!(body, expected);
    }

    #[test]
    fn subject_names_the_channel() {
        assert_eq!(
            success_subject("Acme Channel"),
            "Your Improved YouTube Titles for Acme Channel"
        );
    }

    #[test]
    fn failure_notice_is_generic() {
        assert!(!FAILURE_BODY.contains("error"));
        assert!(FAILURE_SUBJECT.contains("Request Failed"));
    }
}
