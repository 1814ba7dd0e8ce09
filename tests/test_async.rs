use xmlcore::{events::Event::*, Reader};
use std::str::from_utf8;

use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_xml_decl() {
    let mut r = Reader::builder()
        .trim_text(true)
        .into_str_reader("<?xml version=\"1.0\" encoding='utf-8'?>");
    let mut buf = Vec::new();
    match r.read_event_into_async(&mut buf).await.unwrap() {
        Decl(ref e) => {
            match e.version() {
                Ok(v) => assert_eq!(
                    &*v,
                    b"1.0",
                    "expecting version '1.0', got '{:?}",
                    from_utf8(&*v)
                ),
                Err(e) => assert!(false, "{:?}", e),
            }
            match e.encoding() {
                Some(v) => assert_eq!(
                    &*v,
                    b"utf-8",
                    "expecting encoding 'utf-8', got '{:?}",
                    from_utf8(&*v)
                ),
                None => panic!("cannot find encoding"),
            }
            match e.standalone() {
                None => (),
                Some(e) => panic!("doesn't expect standalone, got {:?}", e),
            }
        }
        _ => panic!("unable to parse XmlDecl"),
    }
}

#[tokio::test]
async fn test_async_reads_start_and_end_tags() {
    let mut r = Reader::builder().into_str_reader("<a><b/></a>");
    let mut buf = Vec::new();
    let mut names = Vec::new();
    loop {
        match r.read_event_into_async(&mut buf).await.unwrap() {
            Start(e) => names.push(e.name().as_ref().to_vec()),
            Empty(e) => names.push(e.name().as_ref().to_vec()),
            Eof => break,
            _ => {}
        }
        buf.clear();
    }
    assert_eq!(names, vec![b"a".to_vec(), b"b".to_vec()]);
}
