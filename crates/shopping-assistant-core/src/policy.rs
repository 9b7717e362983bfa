//! JSON shapes and prompt rendering for policy documents.

use serde_json::{json, Value};

use crate::models::Policy;

pub const POLICY_TYPE: &str = "policy";
pub const POLICY_LIST_TYPE: &str = "policy_list";

/// `{"type":"policy","policy":{...}}`
pub fn policy_payload(policy: &Policy) -> Value {
    json!({ "type": POLICY_TYPE, "policy": policy })
}

/// `{"type":"policy","error":"not_found","message":...}`
pub fn policy_not_found(code: &str) -> Value {
    json!({
        "type": POLICY_TYPE,
        "error": "not_found",
        "message": format!("No policy found with code: {}", code),
    })
}

/// `{"type":"policy_list","query"?:...,"count":n,"items":[...]}`
pub fn policy_list_payload(query: Option<&str>, policies: &[Policy]) -> Value {
    let mut v = json!({
        "type": POLICY_LIST_TYPE,
        "count": policies.len(),
        "items": policies,
    });
    if let Some(q) = query {
        v["query"] = Value::String(q.to_string());
    }
    v
}

/// Markdown block handed to the chat model as grounding.
pub fn render_policy_context(policies: &[Policy]) -> String {
    let mut out = String::from(
        "Answer using only the shop policies below. Cite the policy title. \
         If they do not cover the question, say so.\n",
    );
    for p in policies {
        out.push_str(&format!(
            "\n## {} ({} v{}, effective {})\n{}\n",
            p.title,
            p.code,
            p.version,
            p.effective_date.format("%Y-%m-%d"),
            p.content_markdown.trim()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn refund() -> Policy {
        Policy {
            id: "p1".into(),
            code: "BUYER_REFUND".into(),
            title: "Hoàn tiền".into(),
            version: "2".into(),
            content_markdown: "  7 ngày  \n".into(),
            effective_date: NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn list_payload_shape() {
        let v = policy_list_payload(Some("hoan tien"), &[refund()]);
        assert_eq!(v["type"], "policy_list");
        assert_eq!(v["count"], 1);
        assert_eq!(v["query"], "hoan tien");
        assert_eq!(v["items"][0]["contentMarkdown"], "  7 ngày  \n");
        assert_eq!(v["items"][0]["effectiveDate"], "2025-03-01T08:00:00");

        let v = policy_list_payload(None, &[]);
        assert!(v.get("query").is_none());
        assert_eq!(v["items"], json!([]));
    }

    #[test]
    fn not_found_shape() {
        let v = policy_not_found("NOPE");
        assert_eq!(v["error"], "not_found");
        assert_eq!(v["type"], "policy");
    }

    #[test]
    fn context_lists_each_policy() {
        let ctx = render_policy_context(&[refund()]);
        assert!(ctx.contains("## Hoàn tiền (BUYER_REFUND v2, effective 2025-03-01)\n7 ngày\n"));
    }
}
