use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct ApiRoot {
    #[serde(default)]
    pub refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
pub struct ApiRef {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

impl ApiRoot {
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<RawDocument>,
    #[serde(default)]
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl RawDocument {
    pub fn text_field(&self, name: &str) -> String {
        self.data
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_tolerates_null_cursor() {
        let resp: SearchResponse =
            serde_json::from_str(r#"{"results": [], "next_page": null}"#).unwrap();
        assert!(resp.next_page.is_none());

        let resp: SearchResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(resp.next_page.is_none());
    }

    #[test]
    fn master_ref_is_picked() {
        let root: ApiRoot = serde_json::from_str(
            r#"{"refs": [
                {"id": "preview", "ref": "P1", "isMasterRef": false},
                {"id": "master", "ref": "M1", "isMasterRef": true}
            ]}"#,
        )
        .unwrap();
        assert_eq!(root.master_ref(), Some("M1"));
    }

    #[test]
    fn text_field_is_lenient() {
        let doc: RawDocument = serde_json::from_str(
            r#"{"uid": "a", "data": {"title": "Hello", "author": 7}}"#,
        )
        .unwrap();
        assert_eq!(doc.text_field("title"), "Hello");
        assert_eq!(doc.text_field("author"), "");
        assert_eq!(doc.text_field("subtitle"), "");
    }
}
