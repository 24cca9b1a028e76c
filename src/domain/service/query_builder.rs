use serde_json::{json, Map, Value};

use crate::domain::entity::{Bounds, SearchRequest, SortField};

/// BuiltQuery は 1 リクエスト分のストアクエリ。同一リクエストからはバイト単位で同一のクエリが組み立てられる。
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    body: Value,
    from: u64,
    size: u32,
}

impl BuiltQuery {
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn from(&self) -> u64 {
        self.from
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

/// build_query は multi_match の must 句、範囲フィルタ、ソート、ページングからなる bool クエリを組み立てる。
pub fn build_query(request: &SearchRequest) -> BuiltQuery {
    // BTreeSet iterates in declaration order, independent of input order.
    let fields: Vec<&str> = request.fields.iter().map(|f| f.as_str()).collect();

    let mut filters = Vec::new();
    let date = Bounds::new(
        request.date.min.map(|d| d.format("%Y-%m-%d").to_string()),
        request.date.max.map(|d| d.format("%Y-%m-%d").to_string()),
    );
    push_range(&mut filters, SortField::Datum, &date);
    push_range(&mut filters, SortField::Hoehe, &request.height);
    push_range(&mut filters, SortField::Breite, &request.width);

    let sort = match request.sort_by {
        Some(field) => json!([{ field.as_str(): { "order": request.order.as_str() } }]),
        None => json!([{ "_score": { "order": "desc" } }]),
    };

    let from = request.offset();
    let size = request.limit;

    let body = json!({
        "query": {
            "bool": {
                "must": [
                    {
                        "multi_match": {
                            "query": request.keyword,
                            "fields": fields,
                        }
                    }
                ],
                "filter": filters,
            }
        },
        "sort": sort,
        "from": from,
        "size": size,
        "track_total_hits": true,
    });

    BuiltQuery { body, from, size }
}

fn push_range<T: serde::Serialize + PartialOrd>(
    filters: &mut Vec<Value>,
    field: SortField,
    bounds: &Bounds<T>,
) {
    if bounds.is_unbounded() {
        return;
    }
    let mut range = Map::new();
    if let Some(min) = &bounds.min {
        range.insert("gte".to_string(), json!(min));
    }
    if let Some(max) = &bounds.max {
        range.insert("lte".to_string(), json!(max));
    }
    filters.push(json!({ "range": { field.as_str(): range } }));
}
