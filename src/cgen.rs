//! C source grammar codec
//!
//! Reads and writes the line-oriented C fragments that asset files are made
//! of: `#define` macros, `//` metadata comments, extern array declarations,
//! struct typedefs, hex array literals and struct literals. The emitted text
//! is simultaneously compilable C and this crate's wire format, so every
//! writer here has a matching reader that reproduces the value sequence
//! exactly.
//!
//! Readers operate on a [`SourceReader`] over in-memory text and report
//! failures as [`CodecError`] instead of panicking. With one exception the
//! reader is left advanced past the offending line on failure; only
//! [`read_struct`] rewinds to its pre-call position when the struct type
//! does not match, so callers can probe for optional sections.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use thiserror::Error;

/// The closed set of C types that can appear in generated declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CType {
    Struct,
    Char,
    Short,
    Int,
    UnsignedChar,
    UnsignedShort,
    UnsignedInt,

    PtrChar,
    PtrShort,
    PtrInt,
    PtrUnsignedChar,
    PtrUnsignedShort,
    PtrUnsignedInt,

    ConstStruct,
    ConstChar,
    ConstShort,
    ConstInt,
    ConstUnsignedChar,
    ConstUnsignedShort,
    ConstUnsignedInt,

    ConstPtrChar,
    ConstPtrShort,
    ConstPtrInt,
    ConstPtrUnsignedChar,
    ConstPtrUnsignedShort,
    ConstPtrUnsignedInt,
}

impl CType {
    /// The C source spelling of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            CType::Struct => "struct",
            CType::Char => "char",
            CType::Short => "short",
            CType::Int => "int",
            CType::UnsignedChar => "unsigned char",
            CType::UnsignedShort => "unsigned short",
            CType::UnsignedInt => "unsigned int",

            CType::PtrChar => "char*",
            CType::PtrShort => "short*",
            CType::PtrInt => "int*",
            CType::PtrUnsignedChar => "unsigned char*",
            CType::PtrUnsignedShort => "unsigned short*",
            CType::PtrUnsignedInt => "unsigned int*",

            CType::ConstStruct => "const struct",
            CType::ConstChar => "const char",
            CType::ConstShort => "const short",
            CType::ConstInt => "const int",
            CType::ConstUnsignedChar => "const unsigned char",
            CType::ConstUnsignedShort => "const unsigned short",
            CType::ConstUnsignedInt => "const unsigned int",

            CType::ConstPtrChar => "const char*",
            CType::ConstPtrShort => "const short*",
            CType::ConstPtrInt => "const int*",
            CType::ConstPtrUnsignedChar => "const unsigned char*",
            CType::ConstPtrUnsignedShort => "const unsigned short*",
            CType::ConstPtrUnsignedInt => "const unsigned int*",
        }
    }

    /// Hex digit count for literal values of this type: 2/4/8 digits for
    /// 1/2/4-byte element types, 0 for aggregate types.
    pub fn hex_width(self) -> usize {
        match self {
            CType::Struct | CType::ConstStruct => 0,
            CType::Char
            | CType::UnsignedChar
            | CType::PtrChar
            | CType::PtrUnsignedChar
            | CType::ConstChar
            | CType::ConstUnsignedChar
            | CType::ConstPtrChar
            | CType::ConstPtrUnsignedChar => 2,
            CType::Short
            | CType::UnsignedShort
            | CType::PtrShort
            | CType::PtrUnsignedShort
            | CType::ConstShort
            | CType::ConstUnsignedShort
            | CType::ConstPtrShort
            | CType::ConstPtrUnsignedShort => 4,
            CType::Int
            | CType::UnsignedInt
            | CType::PtrInt
            | CType::PtrUnsignedInt
            | CType::ConstInt
            | CType::ConstUnsignedInt
            | CType::ConstPtrInt
            | CType::ConstPtrUnsignedInt => 8,
        }
    }
}

/// Error raised by the reading half of the codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct CodecError {
    pub message: String,
    pub line: usize,
}

impl CodecError {
    fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

/// Cursor over in-memory source text with line and token granularity.
///
/// Token reads skip whitespace, including newlines, so array and struct
/// literal values can be consumed across line breaks. The cursor position
/// can be saved and restored, which [`read_struct`] uses to rewind.
pub struct SourceReader<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

/// A saved [`SourceReader`] position.
#[derive(Debug, Clone, Copy)]
pub struct Mark {
    pos: usize,
    line: usize,
}

impl<'a> SourceReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0, line: 1 }
    }

    /// 1-based line number of the cursor, for error reporting.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Save the current position.
    pub fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
        }
    }

    /// Restore a previously saved position.
    pub fn rewind(&mut self, mark: Mark) {
        self.pos = mark.pos;
        self.line = mark.line;
    }

    /// Read the next line, without its terminator. Returns `None` at end of
    /// input.
    pub fn read_line(&mut self) -> Option<&'a str> {
        if self.at_end() {
            return None;
        }
        let rest = &self.text[self.pos..];
        let (line, consumed) = match rest.find('\n') {
            Some(idx) => (&rest[..idx], idx + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;
        self.line += 1;
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    /// Read the next whitespace-delimited token, crossing line breaks.
    /// Returns `None` when only whitespace remains.
    pub fn read_token(&mut self) -> Option<&'a str> {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            if bytes[self.pos] == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return None;
        }
        let start = self.pos;
        while self.pos < bytes.len() && !bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        Some(&self.text[start..self.pos])
    }
}

/// Split a line into whitespace-delimited tokens.
fn line_tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split_ascii_whitespace()
}

fn err_expected(what: &str, r: &SourceReader) -> CodecError {
    CodecError::new(format!("expected {what}"), r.line())
}

/// Write `#define ID VALUE`. VALUE may be an integer or an identifier.
pub fn write_macro(out: &mut String, id: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "#define {id} {value}");
}

/// Read one `#define ID VALUE` line, returning the id and the raw value
/// token.
pub fn read_macro(r: &mut SourceReader) -> Result<(String, String), CodecError> {
    let line = r.read_line().ok_or_else(|| err_expected("#define", r))?;
    let mut tokens = line_tokens(line);
    if tokens.next() != Some("#define") {
        return Err(err_expected("#define", r));
    }
    let id = tokens.next().ok_or_else(|| err_expected("macro id", r))?;
    let value = tokens.next().ok_or_else(|| err_expected("macro value", r))?;
    Ok((id.to_string(), value.to_string()))
}

/// Read one `#define ID VALUE` line where VALUE is an integer.
pub fn read_macro_int(r: &mut SourceReader) -> Result<(String, i32), CodecError> {
    let line = r.line();
    let (id, value) = read_macro(r)?;
    let value = value
        .parse()
        .map_err(|_| CodecError::new(format!("macro value `{value}` is not an integer"), line))?;
    Ok((id, value))
}

/// Write a `// key:value key:value` metadata comment. Keys are emitted in
/// sorted order so output is reproducible. An empty map writes nothing.
pub fn write_metadata(out: &mut String, metadata: &BTreeMap<String, String>) {
    if metadata.is_empty() {
        return;
    }
    out.push_str("// ");
    for (key, value) in metadata {
        let _ = write!(out, "{key}:{value} ");
    }
    out.push('\n');
}

/// Read a `// key:value` metadata comment. A key with no `:value` part
/// yields an empty string.
pub fn read_metadata(r: &mut SourceReader) -> Result<BTreeMap<String, String>, CodecError> {
    let line = r.read_line().ok_or_else(|| err_expected("metadata comment", r))?;
    let mut tokens = line_tokens(line);
    if tokens.next() != Some("//") {
        return Err(err_expected("metadata comment", r));
    }
    let mut metadata = BTreeMap::new();
    for keyvalue in tokens {
        let (key, value) = match keyvalue.split_once(':') {
            Some((key, value)) => (key, value),
            None => (keyvalue, ""),
        };
        metadata.insert(key.to_string(), value.to_string());
    }
    Ok(metadata)
}

/// Write `extern <ctype> <id> [];`.
pub fn write_array_decl(out: &mut String, ty: CType, id: &str) {
    let _ = writeln!(out, "extern {} {} [];", ty.as_str(), id);
}

/// Read an `extern <ctype> <id> [];` line, returning the type string and
/// the id. Multi-word types (`const`, `unsigned` prefixes) are joined.
pub fn read_array_decl(r: &mut SourceReader) -> Result<(String, String), CodecError> {
    let line = r.read_line().ok_or_else(|| err_expected("array declaration", r))?;
    let mut tokens = line_tokens(line);
    if tokens.next() != Some("extern") {
        return Err(err_expected("extern", r));
    }

    let mut word = tokens.next().ok_or_else(|| err_expected("type", r))?;
    let mut ty = word.to_string();
    while word == "const" || word == "unsigned" {
        word = tokens.next().ok_or_else(|| err_expected("type", r))?;
        ty.push(' ');
        ty.push_str(word);
    }

    let id = tokens.next().ok_or_else(|| err_expected("array id", r))?;
    if tokens.next() != Some("[];") {
        return Err(err_expected("[];", r));
    }
    Ok((ty, id.to_string()))
}

/// Write `extern struct <Type> <id>;`.
pub fn write_struct_decl(out: &mut String, type_name: &str, id: &str) {
    let _ = writeln!(out, "extern struct {type_name} {id};");
}

/// Write a `typedef struct` definition with one field per line.
pub fn write_struct_def(out: &mut String, type_name: &str, fields: &[(CType, String)]) {
    let _ = writeln!(out, "typedef struct {type_name}");
    out.push_str("{\n");
    for (ty, id) in fields {
        let _ = writeln!(out, "\t{} {};", ty.as_str(), id);
    }
    let _ = writeln!(out, "}} {type_name};");
}

/// Write a struct literal `<Type> <id> ={ ... };` with one value per line.
pub fn write_struct(out: &mut String, type_name: &str, id: &str, field_data: &[String]) {
    let _ = writeln!(out, "{type_name} {id} ={{");
    for value in field_data {
        let _ = writeln!(out, "\t{value},");
    }
    out.push_str("};\n");
}

/// Read a struct literal of the given type, returning its id and raw field
/// values.
///
/// If the first token of the next line is not `type_name` the reader is
/// rewound to where it was before the call, so a caller can probe for an
/// optional struct and fall through to whatever actually comes next. Any
/// later failure leaves the reader advanced.
pub fn read_struct(
    r: &mut SourceReader,
    type_name: &str,
) -> Result<(String, Vec<String>), CodecError> {
    let start = r.mark();
    let line = r.read_line().unwrap_or("");
    let mut tokens = line_tokens(line);

    if tokens.next() != Some(type_name) {
        r.rewind(start);
        return Err(err_expected(&format!("struct literal of type {type_name}"), r));
    }

    let id = tokens.next().ok_or_else(|| err_expected("struct id", r))?;
    let assignment: String = tokens.collect();
    if assignment != "={" {
        return Err(err_expected("={", r));
    }

    let mut field_data = Vec::new();
    loop {
        let token = r.read_token().ok_or_else(|| err_expected("}; terminator", r))?;
        let token = token.replace(',', "");
        if token == "};" {
            break;
        }
        if !token.is_empty() {
            field_data.push(token);
        }
    }
    Ok((id.to_string(), field_data))
}

/// Values per line in array literals.
const ARRAY_WRAP: usize = 9;

/// Streaming writer for hex array literals.
///
/// Emits `<ctype> <id> []={`, then zero-padded hex values nine to a line,
/// then `};`. The digit count is fixed by the element type, so the output
/// is canonical byte-for-byte.
pub struct ArrayWriter<'a> {
    out: &'a mut String,
    ty: CType,
    column: usize,
}

impl<'a> ArrayWriter<'a> {
    pub fn new(out: &'a mut String) -> Self {
        Self {
            out,
            ty: CType::Struct,
            column: 0,
        }
    }

    pub fn begin(&mut self, ty: CType, id: &str) {
        self.ty = ty;
        self.column = 0;
        let _ = write!(self.out, "{} {} []={{\n    ", ty.as_str(), id);
    }

    pub fn write_value(&mut self, value: u32) {
        let _ = write!(self.out, "0x{value:0width$x}, ", width = self.ty.hex_width());
        self.column += 1;
        if self.column >= ARRAY_WRAP {
            self.column = 0;
            self.out.push_str("\n    ");
        }
    }

    pub fn end(&mut self) {
        self.out.push_str("\n};\n");
    }
}

/// Write a whole array literal in one call.
pub fn write_array(out: &mut String, ty: CType, id: &str, values: impl IntoIterator<Item = u32>) {
    let mut writer = ArrayWriter::new(out);
    writer.begin(ty, id);
    for value in values {
        writer.write_value(value);
    }
    writer.end();
}

/// Streaming reader for hex array literals, mirroring [`ArrayWriter`].
pub struct ArrayReader<'a, 'b> {
    r: &'b mut SourceReader<'a>,
    terminated: bool,
}

impl<'a, 'b> ArrayReader<'a, 'b> {
    pub fn new(r: &'b mut SourceReader<'a>) -> Self {
        Self {
            r,
            terminated: false,
        }
    }

    /// Validate the `<ctype> <id> []={` header and return the id.
    pub fn begin(&mut self, ty: CType) -> Result<String, CodecError> {
        self.terminated = false;
        let line = loop {
            match self.r.read_line() {
                Some("") => continue,
                Some(line) => break line,
                None => return Err(err_expected("array literal", self.r)),
            }
        };

        let mut tokens = line_tokens(line);
        let mut word = tokens.next().unwrap_or("");
        let mut type_str = word.to_string();
        while word == "const" || word == "unsigned" {
            word = tokens.next().unwrap_or("");
            type_str.push(' ');
            type_str.push_str(word);
        }
        if type_str != ty.as_str() {
            return Err(err_expected(ty.as_str(), self.r));
        }

        let id = tokens.next().ok_or_else(|| err_expected("array id", self.r))?;
        let assignment: String = tokens.collect();
        if assignment != "[]={" {
            return Err(err_expected("[]={", self.r));
        }
        Ok(id.to_string())
    }

    /// Read the next value. Returns `None` on the `};` sentinel (setting
    /// the terminal flag), at end of input, or for an unparseable token.
    pub fn read_value(&mut self) -> Option<u32> {
        if self.terminated {
            return None;
        }
        let token = self.r.read_token()?;
        let token = token.replace(',', "");
        if token == "};" {
            self.terminated = true;
            return None;
        }
        let digits = token.strip_prefix("0x").unwrap_or(&token);
        u32::from_str_radix(digits, 16).ok()
    }

    /// Consume through the closing `};` line if not already terminated.
    pub fn end(&mut self) -> Result<(), CodecError> {
        if self.terminated {
            return Ok(());
        }
        while let Some(line) = self.r.read_line() {
            if line == "};" {
                return Ok(());
            }
        }
        Err(err_expected("};", self.r))
    }
}

/// Read a whole array literal in one call, returning its id and values.
pub fn read_array(r: &mut SourceReader, ty: CType) -> Result<(String, Vec<u32>), CodecError> {
    let mut reader = ArrayReader::new(r);
    let id = reader.begin(ty)?;
    let mut values = Vec::new();
    while let Some(value) = reader.read_value() {
        values.push(value);
    }
    reader.end()?;
    Ok((id, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_roundtrip() {
        let mut out = String::new();
        write_macro(&mut out, "TILE_COUNT", 512);
        write_macro(&mut out, "TILESET_REF", "forest_pixels");
        assert_eq!(out, "#define TILE_COUNT 512\n#define TILESET_REF forest_pixels\n");

        let mut r = SourceReader::new(&out);
        assert_eq!(read_macro_int(&mut r).unwrap(), ("TILE_COUNT".to_string(), 512));
        let (id, value) = read_macro(&mut r).unwrap();
        assert_eq!(id, "TILESET_REF");
        assert_eq!(value, "forest_pixels");
    }

    #[test]
    fn test_macro_rejects_other_lines() {
        let mut r = SourceReader::new("int x = 2;\n");
        assert!(read_macro(&mut r).is_err());
        // reader is left past the bad line
        assert!(r.at_end());
    }

    #[test]
    fn test_metadata_roundtrip() {
        let mut metadata = BTreeMap::new();
        metadata.insert("name".to_string(), "Forest".to_string());
        metadata.insert("width".to_string(), "128".to_string());
        metadata.insert("shared_palette".to_string(), String::new());

        let mut out = String::new();
        write_metadata(&mut out, &metadata);
        assert_eq!(out, "// name:Forest shared_palette: width:128 \n");

        let mut r = SourceReader::new(&out);
        assert_eq!(read_metadata(&mut r).unwrap(), metadata);
    }

    #[test]
    fn test_metadata_key_without_value() {
        let mut r = SourceReader::new("// dirty name:Map \n");
        let metadata = read_metadata(&mut r).unwrap();
        assert_eq!(metadata.get("dirty").map(String::as_str), Some(""));
        assert_eq!(metadata.get("name").map(String::as_str), Some("Map"));
    }

    #[test]
    fn test_metadata_requires_comment() {
        let mut r = SourceReader::new("#define X 1\n");
        assert!(read_metadata(&mut r).is_err());
    }

    #[test]
    fn test_array_decl_roundtrip() {
        let mut out = String::new();
        write_array_decl(&mut out, CType::ConstUnsignedShort, "Forest_palette");
        assert_eq!(out, "extern const unsigned short Forest_palette [];\n");

        let mut r = SourceReader::new(&out);
        let (ty, id) = read_array_decl(&mut r).unwrap();
        assert_eq!(ty, "const unsigned short");
        assert_eq!(id, "Forest_palette");
    }

    #[test]
    fn test_struct_def_layout() {
        let mut out = String::new();
        write_struct_def(
            &mut out,
            "Palette",
            &[
                (CType::UnsignedShort, "size".to_string()),
                (CType::ConstPtrUnsignedShort, "colors".to_string()),
            ],
        );
        assert_eq!(
            out,
            "typedef struct Palette\n{\n\tunsigned short size;\n\tconst unsigned short* colors;\n} Palette;\n"
        );
    }

    fn roundtrip_array(ty: CType, values: &[u32]) {
        let mut out = String::new();
        write_array(&mut out, ty, "data", values.iter().copied());
        let mut r = SourceReader::new(&out);
        let (id, read) = read_array(&mut r, ty).unwrap();
        assert_eq!(id, "data");
        assert_eq!(read, values);
    }

    #[test]
    fn test_array_roundtrip_all_lengths() {
        for n in [0usize, 1, 9, 10, 100] {
            let values: Vec<u32> = (0..n as u32).map(|i| i * 7 + 1).collect();
            roundtrip_array(CType::ConstUnsignedChar, &values.iter().map(|v| v & 0xff).collect::<Vec<_>>());
            roundtrip_array(CType::ConstUnsignedShort, &values.iter().map(|v| v & 0xffff).collect::<Vec<_>>());
            roundtrip_array(CType::UnsignedInt, &values);
        }
    }

    #[test]
    fn test_array_hex_padding() {
        let mut out = String::new();
        write_array(&mut out, CType::ConstUnsignedShort, "pal", [0x1u32, 0x7fff, 0xab]);
        assert_eq!(
            out,
            "const unsigned short pal []={\n    0x0001, 0x7fff, 0x00ab, \n};\n"
        );
    }

    #[test]
    fn test_array_wraps_every_nine_values() {
        let mut out = String::new();
        write_array(&mut out, CType::ConstUnsignedChar, "px", 0u32..10);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1].split_ascii_whitespace().count(), 9);
        assert_eq!(lines[2].trim(), "0x09,");
    }

    #[test]
    fn test_array_reader_terminates_on_sentinel() {
        let text = "const unsigned char px []={\n    0x01, 0x02, \n};\n";
        let mut r = SourceReader::new(text);
        let mut reader = ArrayReader::new(&mut r);
        reader.begin(CType::ConstUnsignedChar).unwrap();
        assert_eq!(reader.read_value(), Some(1));
        assert_eq!(reader.read_value(), Some(2));
        assert_eq!(reader.read_value(), None);
        // terminal flag set: further reads keep failing, end() succeeds
        assert_eq!(reader.read_value(), None);
        assert!(reader.end().is_ok());
    }

    #[test]
    fn test_array_reader_rejects_wrong_type() {
        let text = "const unsigned char px []={\n    0x01, \n};\n";
        let mut r = SourceReader::new(text);
        let mut reader = ArrayReader::new(&mut r);
        assert!(reader.begin(CType::ConstUnsignedShort).is_err());
    }

    #[test]
    fn test_struct_roundtrip_mixed_types() {
        let fields = vec![
            "3".to_string(),
            "0".to_string(),
            "-8".to_string(),
            "Forest_pixels".to_string(),
            "&Forest".to_string(),
        ];
        let mut out = String::new();
        write_struct(&mut out, "Map", "Overworld", &fields);

        let mut r = SourceReader::new(&out);
        let (id, read) = read_struct(&mut r, "Map").unwrap();
        assert_eq!(id, "Overworld");
        assert_eq!(read, fields);
    }

    #[test]
    fn test_struct_rewinds_on_type_mismatch() {
        let text = "Tileset Forest ={\n\t128,\n};\n";
        let mut r = SourceReader::new(text);
        assert!(read_struct(&mut r, "Map").is_err());
        // the reader was rewound, so the right type still parses
        let (id, fields) = read_struct(&mut r, "Tileset").unwrap();
        assert_eq!(id, "Forest");
        assert_eq!(fields, vec!["128".to_string()]);
    }

    #[test]
    fn test_struct_no_rewind_after_type_matches() {
        let text = "Map Overworld = {\n\t0,\n};\n";
        // "= {" tokenizes to "={" via concatenation, so this still parses;
        // use a genuinely malformed assignment instead
        let bad = "Map Overworld {\n";
        let mut r = SourceReader::new(bad);
        assert!(read_struct(&mut r, "Map").is_err());
        assert!(r.at_end());

        let mut r = SourceReader::new(text);
        assert!(read_struct(&mut r, "Map").is_ok());
    }

    #[test]
    fn test_empty_array_roundtrip() {
        let mut out = String::new();
        write_array(&mut out, CType::ConstUnsignedShort, "empty", []);
        let mut r = SourceReader::new(&out);
        let (id, values) = read_array(&mut r, CType::ConstUnsignedShort).unwrap();
        assert_eq!(id, "empty");
        assert!(values.is_empty());
    }

    #[test]
    fn test_reader_line_numbers() {
        let mut r = SourceReader::new("a\nb\nc\n");
        assert_eq!(r.line(), 1);
        r.read_line();
        assert_eq!(r.line(), 2);
        r.read_line();
        assert_eq!(r.line(), 3);
    }
}
