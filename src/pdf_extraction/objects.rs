// Small lopdf object helpers shared by the text and render paths
use lopdf::{Dictionary, Document, Object, Stream};

const MAX_REFERENCE_DEPTH: usize = 32;

/// Follow indirect references to the underlying object
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..MAX_REFERENCE_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            _ => return Some(current),
        }
    }
    None
}

pub fn dict_get<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|obj| resolve(doc, obj))
}

/// Dictionary of a dictionary or stream object
pub fn as_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

pub fn name(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::Name(n) => Some(n.as_slice()),
        _ => None,
    }
}

/// Six numbers of a matrix operand list or `/Matrix` array
pub fn matrix(values: &[Object]) -> Option<[f64; 6]> {
    if values.len() < 6 {
        return None;
    }
    let mut m = [0.0; 6];
    for (slot, value) in m.iter_mut().zip(values) {
        *slot = number(value)?;
    }
    Some(m)
}

/// Stream payload, decompressed when a filter is declared
pub fn stream_bytes(stream: &Stream) -> Vec<u8> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone())
    } else {
        stream.content.clone()
    }
}

/// Look up a key on a page, walking up the page tree through `/Parent`
pub fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = page;
    for _ in 0..MAX_REFERENCE_DEPTH {
        if let Some(value) = dict_get(doc, current, key) {
            return Some(value);
        }
        current = dict_get(doc, current, b"Parent").and_then(|p| as_dict(doc, p))?;
    }
    None
}
