//! Resource-level metadata.
//!
//! Translates the teiHeader of a work into a DTS/DublinCore-shaped JSON
//! object. Fields missing from the header are omitted rather than failing
//! the transformation.

use serde_json::{Map, Value, json};

use crate::Result;
use crate::config::WorkConfig;
use crate::tei::{Tei, normalize_space};

/// Builds the resource metadata object for a work.
pub fn make_resource_metadata(tei: &Tei, cfg: &WorkConfig) -> Result<Value> {
    let root = tei.document_element()?;
    let header = tei
        .find_child(root, "teiHeader")
        .ok_or_else(|| crate::Error::markup("work has no tei:teiHeader"))?;

    let title = path_text(tei, header, &["fileDesc", "titleStmt"], "title", "type", "short");
    let alt_title = path_text(tei, header, &["fileDesc", "titleStmt"], "title", "type", "main");

    let authors = persons_below(tei, header, &["fileDesc", "titleStmt"], "author", None);
    let author = format_person_names(tei, &authors, false).join("; ");
    let scholarly = editors_with_role(tei, header, "#scholarly");
    let technical = editors_with_role(tei, header, "#technical");
    let scholarly_names = format_person_names(tei, &scholarly, false);
    let technical_names = format_person_names(tei, &technical, false);
    let mut editors = scholarly_names.clone();
    for name in &technical_names {
        if !editors.contains(name) {
            editors.push(name.clone());
        }
    }

    let pub_date = publish_date(tei, header);
    let version = path(tei, header, &["fileDesc", "editionStmt", "edition"])
        .and_then(|e| tei.attr(e, "n"));
    let series_volume = path(tei, header, &["fileDesc", "seriesStmt"]).and_then(|s| {
        tei.child_elements(s)
            .find(|b| tei.is(*b, "biblScope") && tei.attr(*b, "unit").as_deref() == Some("volume"))
            .and_then(|b| tei.attr(b, "n"))
    });

    let source_title = path_text(
        tei,
        header,
        &["fileDesc", "sourceDesc", "biblStruct", "monogr"],
        "title",
        "type",
        "main",
    );
    let source_publishers = format_person_names(tei, &source_publishers(tei, header), false);
    let source_extents = source_extents(tei, header);
    let source_langs: Vec<Value> = path(tei, header, &["profileDesc", "langUsage"])
        .map(|l| {
            tei.child_elements(l)
                .filter(|c| tei.is(*c, "language"))
                .filter_map(|c| tei.attr(c, "ident"))
                .map(Value::from)
                .collect()
        })
        .unwrap_or_default();
    let source_pub_date = source_publish_date(tei, header);
    let source_pub_place = source_publish_place(tei, header);
    let repositories = source_repositories(tei, header);
    let citations = bibliographic_citations(tei, header, cfg);

    let mut dublincore = Map::new();
    insert_opt(&mut dublincore, "dc:title", title.clone().map(Value::from));
    insert_opt(&mut dublincore, "dc:alternative", alt_title.map(Value::from));
    dublincore.insert("dc:contributor".into(), Value::from(editors));
    dublincore.insert(
        "dc:type".into(),
        json!(["http://purl.org/spar/fabio/work", "dc:Text"]),
    );
    insert_opt(&mut dublincore, "dc:created", pub_date);
    if !citations.is_empty() {
        dublincore.insert("dc:bibliographicCitation".into(), Value::from(citations));
    }
    dublincore.insert(
        "dc:rightsHolder".into(),
        json!({
            "@id": cfg.id_server(),
            "name": { "@language": "en", "@value": "The School of Salamanca" }
        }),
    );
    dublincore.insert(
        "dc:license".into(),
        Value::from("http://creativecommons.org/licenses/by/4.0/"),
    );

    let mut source = Map::new();
    insert_opt(&mut source, "dc:title", source_title.map(Value::from));
    if !author.is_empty() {
        source.insert("dc:creator".into(), Value::from(author));
    }
    if !source_publishers.is_empty() {
        source.insert("dc:publisher".into(), Value::from(source_publishers));
    }
    if !source_extents.is_empty() {
        source.insert("dc:format".into(), Value::from(source_extents));
    }
    if !source_langs.is_empty() {
        source.insert("dc:language".into(), Value::from(source_langs));
    }
    insert_opt(&mut source, "dc:created", source_pub_date);
    dublincore.insert("dc:source".into(), Value::Object(source));

    let mut extensions = Map::new();
    insert_opt(&mut extensions, "sal:version", version.map(Value::from));
    extensions.insert("sal:scholarlyEditors".into(), Value::from(scholarly_names));
    extensions.insert("sal:technicalEditors".into(), Value::from(technical_names));
    insert_opt(
        &mut extensions,
        "sal:seriesVolume",
        series_volume.map(Value::from),
    );
    insert_opt(
        &mut extensions,
        "sal:sourcePublishPlace",
        source_pub_place.map(Value::from),
    );
    if !repositories.is_empty() {
        extensions.insert("sal:sourceRepositories".into(), Value::from(repositories));
    }

    Ok(json!({
        "@context": {
            "@vocab": "https://www.w3.org/ns/hydra/core#",
            "dc": "http://purl.org/dc/terms/",
            "dts": "https://w3id.org/dts/api#",
            "sal": format!("{}/", cfg.id_server()),
        },
        "@id": cfg.work_uri(),
        "@type": "Resource",
        "title": title.unwrap_or_default(),
        "totalItems": 0,
        "dts:totalParents": 1,
        "dts:totalChildren": 0,
        "dts:citeDepth": cfg.cite_depth(),
        "dts:dublincore": Value::Object(dublincore),
        "dts:extensions": Value::Object(extensions),
    }))
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

/// Walks a chain of child elements by local name.
fn path(tei: &Tei, from: xot::Node, names: &[&str]) -> Option<xot::Node> {
    names
        .iter()
        .try_fold(from, |node, name| tei.find_child(node, name))
}

/// Text of a child with a given attribute value, e.g. `title[@type=short]`.
fn path_text(
    tei: &Tei,
    from: xot::Node,
    names: &[&str],
    child: &str,
    attr: &str,
    value: &str,
) -> Option<String> {
    let parent = path(tei, from, names)?;
    tei.child_elements(parent)
        .find(|c| tei.is(*c, child) && tei.attr(*c, attr).as_deref() == Some(value))
        .map(|c| normalize_space(&tei.string_value(c)))
        .filter(|s| !s.is_empty())
}

/// `persName` children of a named element below a path, optionally
/// filtered by a `@role` substring.
fn persons_below(
    tei: &Tei,
    from: xot::Node,
    names: &[&str],
    elem: &str,
    role: Option<&str>,
) -> Vec<xot::Node> {
    let Some(parent) = path(tei, from, names) else {
        return Vec::new();
    };
    tei.child_elements(parent)
        .filter(|c| tei.is(*c, elem))
        .filter(|c| match role {
            Some(role) => tei
                .attr(*c, "role")
                .is_some_and(|r| r.contains(role)),
            None => true,
        })
        .flat_map(|c| {
            tei.child_elements(c)
                .filter(|p| tei.is(*p, "persName"))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn editors_with_role(tei: &Tei, header: xot::Node, role: &str) -> Vec<xot::Node> {
    persons_below(tei, header, &["fileDesc", "titleStmt"], "editor", Some(role))
}

/// Extracts full names from `persName` elements: `surname, forename
/// [name link] [& (additional name)]`, reversed on request; an `@key`
/// always wins.
fn format_person_names(tei: &Tei, persons: &[xot::Node], reverse: bool) -> Vec<String> {
    persons
        .iter()
        .map(|person| {
            if let Some(key) = tei.attr(*person, "key") {
                return key;
            }
            let surname = tei
                .find_child(*person, "surname")
                .map(|s| normalize_space(&tei.string_value(s)));
            let forename = tei
                .find_child(*person, "forename")
                .map(|f| normalize_space(&tei.string_value(f)));
            let (Some(surname), Some(forename)) = (surname, forename) else {
                return normalize_space(&tei.string_value(*person));
            };
            let name_link = tei
                .find_child(*person, "nameLink")
                .map(|n| format!(" {}", normalize_space(&tei.string_value(n))))
                .unwrap_or_default();
            let add_name = tei.find_child(*person, "addName").map(|a| {
                let name = normalize_space(&tei.string_value(a));
                if reverse {
                    format!(" <{name}>")
                } else {
                    format!(" & ({name})")
                }
            });
            let add_name = add_name.unwrap_or_default();
            if reverse {
                format!("{forename} {surname}{name_link}{add_name}")
            } else {
                format!("{surname}, {forename}{name_link}{add_name}")
            }
        })
        .collect()
}

/// Digital publication date: a summary range if declared, else the plain
/// edition date.
fn publish_date(tei: &Tei, header: xot::Node) -> Option<Value> {
    let edition = path(tei, header, &["fileDesc", "editionStmt", "edition"])?;
    let date_of = |ty: &str| {
        tei.child_elements(edition)
            .find(|d| tei.is(*d, "date") && tei.attr(*d, "type").as_deref() == Some(ty))
    };
    if let Some(range) = date_of("summaryDigitizedEd") {
        return Some(date_range(tei, range));
    }
    date_of("digitizedEd").map(|d| Value::from(normalize_space(&tei.string_value(d))))
}

fn date_range(tei: &Tei, date: xot::Node) -> Value {
    match tei.attr(date, "from") {
        Some(from) => {
            let mut range = Map::new();
            range.insert("start".into(), Value::from(from));
            if let Some(to) = tei.attr(date, "to") {
                range.insert("to".into(), Value::from(to));
            }
            Value::Object(range)
        }
        None => Value::from(normalize_space(&tei.string_value(date))),
    }
}

fn imprint(tei: &Tei, header: xot::Node) -> Option<xot::Node> {
    path(
        tei,
        header,
        &["fileDesc", "sourceDesc", "biblStruct", "monogr", "imprint"],
    )
}

fn source_publish_date(tei: &Tei, header: xot::Node) -> Option<Value> {
    let imprint = imprint(tei, header)?;
    let date_of = |ty: &str| {
        tei.child_elements(imprint)
            .find(|d| tei.is(*d, "date") && tei.attr(*d, "type").as_deref() == Some(ty))
    };
    if let Some(range) = date_of("summaryThisEd") {
        return Some(date_range(tei, range));
    }
    if let Some(range) = date_of("summaryFirstEd") {
        return Some(date_range(tei, range));
    }
    let year = |node: xot::Node| {
        tei.attr(node, "when")
            .and_then(|w| w.get(..4).and_then(|y| y.parse::<i64>().ok()))
    };
    date_of("thisEd")
        .and_then(year)
        .or_else(|| date_of("firstEd").and_then(year))
        .map(Value::from)
}

fn source_publish_place(tei: &Tei, header: xot::Node) -> Option<String> {
    let imprint = imprint(tei, header)?;
    let place_of = |role: &str| {
        tei.child_elements(imprint)
            .find(|p| tei.is(*p, "pubPlace") && tei.attr(*p, "role").as_deref() == Some(role))
    };
    let place = place_of("thisEd").or_else(|| place_of("firstEd"))?;
    Some(
        tei.attr(place, "key")
            .unwrap_or_else(|| normalize_space(&tei.string_value(place))),
    )
}

fn source_publishers(tei: &Tei, header: xot::Node) -> Vec<xot::Node> {
    let Some(imprint) = imprint(tei, header) else {
        return Vec::new();
    };
    tei.child_elements(imprint)
        .filter(|p| tei.is(*p, "publisher") && tei.attr(*p, "n").as_deref() == Some("firstEd"))
        .flat_map(|p| {
            tei.child_elements(p)
                .filter(|n| tei.is(*n, "persName"))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Physical extents of the source, as i18n objects where a language is
/// declared.
fn source_extents(tei: &Tei, header: xot::Node) -> Vec<Value> {
    let Some(monogr) = path(tei, header, &["fileDesc", "sourceDesc", "biblStruct", "monogr"])
    else {
        return Vec::new();
    };
    tei.child_elements(monogr)
        .filter(|e| tei.is(*e, "extent"))
        .map(|extent| {
            let text = normalize_space(&tei.string_value(extent));
            match tei.xml_attr(extent, "lang") {
                Some(lang) => json!({ "@language": lang, "@value": text }),
                None => Value::from(text),
            }
        })
        .collect()
}

fn source_repositories(tei: &Tei, header: xot::Node) -> Vec<Value> {
    let Some(source_desc) = path(tei, header, &["fileDesc", "sourceDesc"]) else {
        return Vec::new();
    };
    let mut repositories = Vec::new();
    for ms_desc in tei.child_elements(source_desc).filter(|m| tei.is(*m, "msDesc")) {
        for identifier in tei
            .child_elements(ms_desc)
            .filter(|i| tei.is(*i, "msIdentifier"))
        {
            let Some(repository) = tei.find_child(identifier, "repository") else {
                continue;
            };
            let name = normalize_space(&tei.string_value(repository));
            let lang = tei.xml_attr(repository, "lang").unwrap_or_default();
            let link = tei
                .child_elements(identifier)
                .find(|i| tei.is(*i, "idno") && tei.attr(*i, "type").as_deref() == Some("catlink"))
                .map(|i| normalize_space(&tei.string_value(i)));
            repositories.push(json!({
                "owner": { "@language": lang, "@value": name },
                "link": link,
            }));
        }
    }
    repositories
}

/// One citation per series title, in that title's language.
fn bibliographic_citations(tei: &Tei, header: xot::Node, cfg: &WorkConfig) -> Vec<Value> {
    let surname = path(tei, header, &["fileDesc", "titleStmt"])
        .and_then(|t| tei.child_elements(t).find(|a| tei.is(*a, "author")))
        .and_then(|a| tei.find_child(a, "persName"))
        .and_then(|p| tei.find_child(p, "surname"))
        .map(|s| normalize_space(&tei.string_value(s)));
    let title = path_text(tei, header, &["fileDesc", "titleStmt"], "title", "type", "short");
    let (Some(surname), Some(title)) = (surname, title) else {
        return Vec::new();
    };

    let edition = path(tei, header, &["fileDesc", "editionStmt", "edition"]);
    let publish_year = edition
        .and_then(|e| {
            tei.child_elements(e).find(|d| {
                tei.is(*d, "date")
                    && matches!(
                        tei.attr(*d, "type").as_deref(),
                        Some("digitizedEd") | Some("summaryDigitizedEd")
                    )
            })
        })
        .and_then(|d| tei.attr(d, "when"))
        .and_then(|w| w.get(..4).map(str::to_string))
        .unwrap_or_default();
    let source_year = imprint(tei, header)
        .and_then(|i| {
            let date_of = |ty: &str| {
                tei.child_elements(i)
                    .find(|d| tei.is(*d, "date") && tei.attr(*d, "type").as_deref() == Some(ty))
            };
            date_of("thisEd").or_else(|| date_of("firstEd"))
        })
        .and_then(|d| tei.attr(d, "when"))
        .unwrap_or_default();

    let Some(series) = path(tei, header, &["fileDesc", "seriesStmt"]) else {
        return Vec::new();
    };
    tei.child_elements(series)
        .filter(|t| tei.is(*t, "title") && tei.attr(*t, "level").as_deref() == Some("s"))
        .map(|series_title| {
            let lang = tei.xml_attr(series_title, "lang").unwrap_or_default();
            let citation = format!(
                "{surname}, {title} ({publish_year}[{source_year}]), {} <{}>",
                normalize_space(&tei.string_value(series_title)),
                cfg.work_uri()
            );
            json!({ "@language": lang, "@value": citation })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tei::Tei;

    const HEADER: &str = r##"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc>
      <titleStmt>
        <title type="main">De legibus ac deo legislatore</title>
        <title type="short">De legibus</title>
        <author><persName><surname>Suárez</surname><forename>Francisco</forename></persName></author>
        <editor role="#scholarly"><persName key="Editor, Example"/></editor>
        <editor role="#technical"><persName><surname>Doe</surname><forename>Jane</forename></persName></editor>
      </titleStmt>
      <editionStmt><edition n="1.0">
        <date type="digitizedEd" when="2019-06-01">2019</date>
      </edition></editionStmt>
      <seriesStmt>
        <title level="s" xml:lang="en">The School of Salamanca. A Digital Collection of Sources</title>
        <biblScope unit="volume" n="4"/>
      </seriesStmt>
      <sourceDesc>
        <biblStruct><monogr>
          <title type="main">De legibus</title>
          <imprint>
            <publisher n="firstEd"><persName><surname>Gómez</surname><forename>Juan</forename></persName></publisher>
            <pubPlace role="firstEd" key="Coimbra"/>
            <date type="firstEd" when="1612-01-01"/>
          </imprint>
          <extent xml:lang="la">780 pp.</extent>
        </monogr></biblStruct>
      </sourceDesc>
    </fileDesc>
    <profileDesc><langUsage><language ident="la"/></langUsage></profileDesc>
    <encodingDesc><charDecl>
      <char xml:id="char017f"><mapping type="standardized">s</mapping></char>
    </charDecl></encodingDesc>
  </teiHeader>
  <text xml:id="completeWork"><body><div type="chapter" xml:id="c1"><p xml:id="p1">x</p></div></body></text>
</TEI>"##;

    #[test]
    fn metadata_shape_from_header() {
        let tei = Tei::parse(HEADER).unwrap();
        let mut cfg = WorkConfig::new("W0004", "https://id.example", "https://img.example");
        cfg.read_header(&tei).unwrap();
        cfg.observe_level(3);
        let metadata = make_resource_metadata(&tei, &cfg).unwrap();

        assert_eq!(metadata["@id"], "https://id.example/texts/W0004");
        assert_eq!(metadata["title"], "De legibus");
        assert_eq!(metadata["dts:citeDepth"], 3);
        let dc = &metadata["dts:dublincore"];
        assert_eq!(dc["dc:alternative"], "De legibus ac deo legislatore");
        assert_eq!(dc["dc:created"], "2019");
        assert_eq!(dc["dc:source"]["dc:creator"], "Suárez, Francisco");
        assert_eq!(dc["dc:source"]["dc:created"], 1612);
        assert_eq!(dc["dc:source"]["dc:publisher"][0], "Gómez, Juan");
        assert_eq!(dc["dc:source"]["dc:language"][0], "la");
        assert_eq!(
            dc["dc:source"]["dc:format"][0],
            serde_json::json!({ "@language": "la", "@value": "780 pp." })
        );
        let extensions = &metadata["dts:extensions"];
        assert_eq!(extensions["sal:version"], "1.0");
        assert_eq!(extensions["sal:seriesVolume"], "4");
        assert_eq!(extensions["sal:sourcePublishPlace"], "Coimbra");
        assert_eq!(extensions["sal:scholarlyEditors"][0], "Editor, Example");
        assert_eq!(extensions["sal:technicalEditors"][0], "Doe, Jane");
        let citation = dc["dc:bibliographicCitation"][0]["@value"]
            .as_str()
            .unwrap();
        assert!(citation.starts_with("Suárez, De legibus (2019[1612-01-01])"));
        assert!(citation.ends_with("<https://id.example/texts/W0004>"));
    }
}
