//! MDPA (`.mdpa`) reader/writer.
//!
//! # Supported format
//! - `Begin Properties <id>` … `End Properties`: the id is recorded, the
//!   contents are ignored.
//! - `Begin Nodes`: one `id x y z` row per node.
//! - `Begin Elements <Type>` / `Begin Conditions <Type>`: one
//!   `id property n1 n2 …` row per entity. Any node count is accepted here;
//!   refinement reports unsupported shapes.
//! - `Begin SubModelPart <name>` with `SubModelPartNodes`,
//!   `SubModelPartElements`, `SubModelPartConditions` id lists and nested
//!   `SubModelPart` blocks.
//!
//! # Limitations
//! - `ModelPartData`, `Tables`, `NodalData` and any other block are skipped.
//! - Sub-model part members must already be members of the enclosing part.
//!
//! Text following `//` on a line is a comment.

use crate::io::{MeshReader, MeshWriter};
use crate::mesh_error::MeshRefineError;
use crate::topology::entity::{Condition, ConnectedEntity, Element, Node};
use crate::topology::hierarchy::{MeshHierarchy, ScopeId, ScopedEntity};
use crate::topology::id::{EntityId, PropertyId};
use itertools::Itertools;
use std::io::{Read, Write};
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
pub struct MdpaReader;

#[derive(Debug, Default, Clone)]
pub struct MdpaWriter;

fn parse_error(line: usize, message: impl Into<String>) -> MeshRefineError {
    MeshRefineError::MeshIoParse {
        line,
        message: message.into(),
    }
}

/// Non-empty, comment-stripped lines with their 1-based line numbers.
struct Cursor<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
        }
    }

    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        for (idx, raw) in self.lines.by_ref() {
            let line = raw.split("//").next().unwrap_or_default().trim();
            if !line.is_empty() {
                return Some((idx + 1, line));
            }
        }
        None
    }
}

enum Line<'a> {
    Begin { kind: &'a str, arg: Option<&'a str> },
    End(&'a str),
    Data(&'a str),
}

fn classify(no: usize, line: &str) -> Result<Line<'_>, MeshRefineError> {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some("Begin") => {
            let kind = tokens
                .next()
                .ok_or_else(|| parse_error(no, "`Begin` without block name"))?;
            Ok(Line::Begin {
                kind,
                arg: tokens.next(),
            })
        }
        Some("End") => {
            let kind = tokens
                .next()
                .ok_or_else(|| parse_error(no, "`End` without block name"))?;
            Ok(Line::End(kind))
        }
        _ => Ok(Line::Data(line)),
    }
}

fn unterminated(kind: &str, opened_at: usize) -> MeshRefineError {
    parse_error(opened_at, format!("unterminated `Begin {kind}` block"))
}

fn parse_u64(no: usize, token: Option<&str>, what: &str) -> Result<u64, MeshRefineError> {
    let token = token.ok_or_else(|| parse_error(no, format!("missing {what}")))?;
    token
        .parse::<u64>()
        .map_err(|_| parse_error(no, format!("invalid {what}: `{token}`")))
}

fn parse_id(no: usize, token: Option<&str>, what: &str) -> Result<EntityId, MeshRefineError> {
    let raw = parse_u64(no, token, what)?;
    EntityId::new(raw).map_err(|_| parse_error(no, format!("{what} must be non-zero")))
}

fn parse_coord(no: usize, token: Option<&str>) -> Result<f64, MeshRefineError> {
    let token = token.ok_or_else(|| parse_error(no, "missing coordinate"))?;
    token
        .parse::<f64>()
        .map_err(|_| parse_error(no, format!("invalid coordinate: `{token}`")))
}

/// Skips a block, including nested blocks, up to its matching `End`.
fn skip_block(cur: &mut Cursor<'_>, kind: &str, opened_at: usize) -> Result<(), MeshRefineError> {
    let mut depth = 0usize;
    loop {
        let (no, line) = cur.next_line().ok_or_else(|| unterminated(kind, opened_at))?;
        match classify(no, line)? {
            Line::Begin { .. } => depth += 1,
            Line::End(k) if depth == 0 => {
                if k != kind {
                    return Err(parse_error(no, format!("expected `End {kind}`, found `{line}`")));
                }
                return Ok(());
            }
            Line::End(_) => depth -= 1,
            Line::Data(_) => {}
        }
    }
}

/// Feeds every data row of a flat block to `row`, up to `End <kind>`.
fn read_rows<'a, F>(
    cur: &mut Cursor<'a>,
    kind: &str,
    opened_at: usize,
    mut row: F,
) -> Result<(), MeshRefineError>
where
    F: FnMut(usize, &'a str) -> Result<(), MeshRefineError>,
{
    loop {
        let (no, line) = cur.next_line().ok_or_else(|| unterminated(kind, opened_at))?;
        match classify(no, line)? {
            Line::End(k) if k == kind => return Ok(()),
            Line::Data(data) => row(no, data)?,
            _ => return Err(parse_error(no, format!("expected `End {kind}`, found `{line}`"))),
        }
    }
}

fn read_nodes(
    cur: &mut Cursor<'_>,
    mesh: &mut MeshHierarchy,
    opened_at: usize,
) -> Result<(), MeshRefineError> {
    read_rows(cur, "Nodes", opened_at, |no, row| {
        let mut tokens = row.split_whitespace();
        let id = parse_id(no, tokens.next(), "node id")?;
        let x = parse_coord(no, tokens.next())?;
        let y = parse_coord(no, tokens.next())?;
        let z = parse_coord(no, tokens.next())?;
        mesh.insert_node(Node::new(id, [x, y, z]))
    })
}

fn read_connected<E, F>(
    cur: &mut Cursor<'_>,
    mesh: &mut MeshHierarchy,
    kind: &str,
    type_name: Option<&str>,
    opened_at: usize,
    make: F,
) -> Result<(), MeshRefineError>
where
    E: ScopedEntity,
    F: Fn(EntityId, Arc<str>, PropertyId, Vec<EntityId>) -> E,
{
    let type_name: Arc<str> = type_name
        .ok_or_else(|| parse_error(opened_at, format!("`Begin {kind}` without type name")))?
        .into();
    read_rows(cur, kind, opened_at, |no, row| {
        let mut tokens = row.split_whitespace();
        let id = parse_id(no, tokens.next(), "entity id")?;
        let properties = parse_u64(no, tokens.next(), "property id")?;
        let nodes = tokens
            .map(|t| parse_id(no, Some(t), "node id"))
            .collect::<Result<Vec<_>, _>>()?;
        if nodes.is_empty() {
            return Err(parse_error(no, format!("entity {id} has no nodes")));
        }
        make(id, Arc::clone(&type_name), properties, nodes).insert_into(mesh)
    })
}

/// A parsed `SubModelPart`; applied to the hierarchy once the file is read.
#[derive(Debug, Default)]
struct PartBlock {
    name: String,
    nodes: Vec<EntityId>,
    elements: Vec<EntityId>,
    conditions: Vec<EntityId>,
    children: Vec<PartBlock>,
}

fn read_id_list(
    cur: &mut Cursor<'_>,
    kind: &str,
    opened_at: usize,
    out: &mut Vec<EntityId>,
) -> Result<(), MeshRefineError> {
    read_rows(cur, kind, opened_at, |no, row| {
        for token in row.split_whitespace() {
            out.push(parse_id(no, Some(token), "entity id")?);
        }
        Ok(())
    })
}

fn read_part(
    cur: &mut Cursor<'_>,
    name: Option<&str>,
    opened_at: usize,
) -> Result<PartBlock, MeshRefineError> {
    let name = name.ok_or_else(|| parse_error(opened_at, "`Begin SubModelPart` without name"))?;
    let mut part = PartBlock {
        name: name.to_string(),
        ..PartBlock::default()
    };
    loop {
        let (no, line) = cur
            .next_line()
            .ok_or_else(|| unterminated("SubModelPart", opened_at))?;
        match classify(no, line)? {
            Line::Begin { kind, arg } => match kind {
                "SubModelPartNodes" => read_id_list(cur, kind, no, &mut part.nodes)?,
                "SubModelPartElements" => read_id_list(cur, kind, no, &mut part.elements)?,
                "SubModelPartConditions" => read_id_list(cur, kind, no, &mut part.conditions)?,
                "SubModelPart" => part.children.push(read_part(cur, arg, no)?),
                _ => skip_block(cur, kind, no)?,
            },
            Line::End("SubModelPart") => return Ok(part),
            _ => {
                return Err(parse_error(
                    no,
                    format!("unexpected `{line}` in sub-model part `{}`", part.name),
                ));
            }
        }
    }
}

fn apply_part(
    mesh: &mut MeshHierarchy,
    parent: ScopeId,
    part: &PartBlock,
) -> Result<(), MeshRefineError> {
    let scope = mesh.create_scope(parent, &part.name)?;
    mesh.add_to_scope::<Node, _>(scope, part.nodes.iter().copied())?;
    mesh.add_to_scope::<Element, _>(scope, part.elements.iter().copied())?;
    mesh.add_to_scope::<Condition, _>(scope, part.conditions.iter().copied())?;
    for child in &part.children {
        apply_part(mesh, scope, child)?;
    }
    Ok(())
}

impl MeshReader for MdpaReader {
    fn read<R: Read>(&self, name: &str, mut reader: R) -> Result<MeshHierarchy, MeshRefineError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        let mut cur = Cursor::new(&contents);

        let mut mesh = MeshHierarchy::new(name);
        let mut parts = Vec::new();
        while let Some((no, line)) = cur.next_line() {
            match classify(no, line)? {
                Line::Begin { kind, arg } => match kind {
                    "Properties" => {
                        mesh.add_property(parse_u64(no, arg, "property id")?);
                        skip_block(&mut cur, kind, no)?;
                    }
                    "Nodes" => read_nodes(&mut cur, &mut mesh, no)?,
                    "Elements" => read_connected(&mut cur, &mut mesh, kind, arg, no, |i, t, p, n| {
                        Element::new(i, t, p, n)
                    })?,
                    "Conditions" => {
                        read_connected(&mut cur, &mut mesh, kind, arg, no, |i, t, p, n| {
                            Condition::new(i, t, p, n)
                        })?
                    }
                    "SubModelPart" => parts.push(read_part(&mut cur, arg, no)?),
                    _ => skip_block(&mut cur, kind, no)?,
                },
                Line::End(kind) => {
                    return Err(parse_error(no, format!("unexpected `End {kind}`")));
                }
                Line::Data(_) => return Err(parse_error(no, "data row outside of a block")),
            }
        }

        for part in &parts {
            apply_part(&mut mesh, ScopeId::ROOT, part)?;
        }
        Ok(mesh)
    }
}

fn write_connected<E: ConnectedEntity, W: Write>(
    writer: &mut W,
    block: &str,
    entities: &[&E],
) -> Result<(), MeshRefineError> {
    let types: Vec<&str> = entities.iter().map(|e| &**e.type_name()).unique().collect();
    for ty in types {
        writeln!(writer, "Begin {block} {ty}")?;
        for e in entities.iter().filter(|e| &**e.type_name() == ty) {
            write!(writer, "{:>8} {:>4}", e.id().get(), e.properties())?;
            for n in e.nodes() {
                write!(writer, " {:>8}", n.get())?;
            }
            writeln!(writer)?;
        }
        writeln!(writer, "End {block}")?;
        writeln!(writer)?;
    }
    Ok(())
}

fn write_id_list<W: Write>(
    writer: &mut W,
    indent: &str,
    block: &str,
    ids: impl Iterator<Item = EntityId>,
) -> Result<(), MeshRefineError> {
    writeln!(writer, "{indent}    Begin {block}")?;
    for id in ids {
        writeln!(writer, "{indent}        {}", id.get())?;
    }
    writeln!(writer, "{indent}    End {block}")?;
    Ok(())
}

fn write_part<W: Write>(
    writer: &mut W,
    mesh: &MeshHierarchy,
    scope: ScopeId,
) -> Result<(), MeshRefineError> {
    let indent = "    ".repeat(mesh.depth(scope) - 1);
    writeln!(writer, "{indent}Begin SubModelPart {}", mesh.scope_name(scope))?;
    write_id_list(writer, &indent, "SubModelPartNodes", mesh.ids::<Node>(scope))?;
    write_id_list(writer, &indent, "SubModelPartElements", mesh.ids::<Element>(scope))?;
    write_id_list(writer, &indent, "SubModelPartConditions", mesh.ids::<Condition>(scope))?;
    for child in mesh.children(scope) {
        write_part(writer, mesh, *child)?;
    }
    writeln!(writer, "{indent}End SubModelPart")?;
    Ok(())
}

impl MeshWriter for MdpaWriter {
    fn write<W: Write>(&self, mut writer: W, mesh: &MeshHierarchy) -> Result<(), MeshRefineError> {
        writeln!(writer, "Begin ModelPartData")?;
        writeln!(writer, "End ModelPartData")?;
        writeln!(writer)?;
        for p in mesh.properties() {
            writeln!(writer, "Begin Properties {p}")?;
            writeln!(writer, "End Properties")?;
            writeln!(writer)?;
        }

        writeln!(writer, "Begin Nodes")?;
        for node in mesh.nodes() {
            let [x, y, z] = node.coords;
            writeln!(
                writer,
                "{:>8} {:>24.16e} {:>24.16e} {:>24.16e}",
                node.id.get(),
                x,
                y,
                z
            )?;
        }
        writeln!(writer, "End Nodes")?;
        writeln!(writer)?;

        let elements: Vec<&Element> = mesh.elements().collect();
        write_connected(&mut writer, "Elements", &elements)?;
        let conditions: Vec<&Condition> = mesh.conditions().collect();
        write_connected(&mut writer, "Conditions", &conditions)?;

        for child in mesh.children(ScopeId::ROOT) {
            write_part(&mut writer, mesh, *child)?;
            writeln!(writer)?;
        }
        Ok(())
    }
}
