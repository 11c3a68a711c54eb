//! TrueType embedding and text encoding.
//!
//! Fonts are embedded as composite (Type0 / CIDFontType2) fonts with the
//! `Identity-H` encoding, so every shown string is a sequence of big-endian
//! glyph ids. Only the widths and Unicode mappings of glyphs actually used
//! are written; the font program itself is embedded whole.

use std::collections::BTreeMap;
use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use ttf_parser::{Face, GlyphId};

use super::DocumentError;
use super::assets::FontAsset;

/// ToUnicode `bfchar` blocks may hold at most 100 entries.
const BFCHAR_CHUNK: usize = 100;

/// Encodes text against one parsed font and remembers which glyphs were used.
pub struct FontEncoder<'a> {
    face: Face<'a>,
    data: &'a [u8],
    asset: FontAsset,
    /// Glyph id to the first character drawn with it; `None` for `.notdef`.
    used: BTreeMap<u16, Option<char>>,
}

impl<'a> FontEncoder<'a> {
    pub fn parse(asset: FontAsset, data: &'a [u8]) -> Result<Self, DocumentError> {
        let face = Face::parse(data, 0).map_err(|e| {
            DocumentError::TemplateUnavailable(format!("font {}: {e}", asset.file_name()))
        })?;
        Ok(Self {
            face,
            data,
            asset,
            used: BTreeMap::new(),
        })
    }

    /// Two bytes per character: the glyph id, or 0 when the font lacks it.
    pub fn encode(&mut self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() * 2);
        for ch in text.chars() {
            let gid = self.face.glyph_index(ch).map_or(0, |g| g.0);
            self.used
                .entry(gid)
                .or_insert(if gid == 0 { None } else { Some(ch) });
            out.extend_from_slice(&gid.to_be_bytes());
        }
        out
    }

    /// Glyph ids encoded so far, ascending.
    pub fn used_glyphs(&self) -> impl Iterator<Item = u16> + '_ {
        self.used.keys().copied()
    }

    fn scale(&self, units: i32) -> i64 {
        let upem = i64::from(self.face.units_per_em().max(1));
        i64::from(units) * 1000 / upem
    }

    fn advance(&self, gid: u16) -> i64 {
        let units = self.face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0);
        self.scale(i32::from(units))
    }

    fn widths(&self) -> Vec<Object> {
        let mut widths = Vec::with_capacity(self.used.len() * 2);
        for gid in self.used.keys() {
            widths.push(Object::Integer(i64::from(*gid)));
            widths.push(Object::Array(vec![Object::Integer(self.advance(*gid))]));
        }
        widths
    }

    fn to_unicode_cmap(&self) -> Vec<u8> {
        let mapped: Vec<(u16, char)> = self
            .used
            .iter()
            .filter_map(|(gid, ch)| ch.map(|c| (*gid, c)))
            .collect();

        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n\
             <0000> <FFFF>\n\
             endcodespacerange\n",
        );
        for chunk in mapped.chunks(BFCHAR_CHUNK) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for (gid, ch) in chunk {
                let mut units = [0u16; 2];
                let utf16: String = ch
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{u:04X}"))
                    .collect();
                cmap.push_str(&format!("<{gid:04X}> <{utf16}>\n"));
            }
            cmap.push_str("endbfchar\n");
        }
        cmap.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end\n",
        );
        cmap.into_bytes()
    }

    fn font_file(&self) -> Result<Stream, DocumentError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(self.data)
            .and_then(|_| encoder.finish())
            .map(|compressed| {
                Stream::new(
                    dictionary! {
                        "Length1" => Object::Integer(self.data.len() as i64),
                        "Filter" => "FlateDecode",
                    },
                    compressed,
                )
            })
            .map_err(|e| DocumentError::Render(format!("compress font: {e}")))
    }

    fn descriptor(&self, font_file: ObjectId) -> Dictionary {
        let bbox = self.face.global_bounding_box();
        let ascent = self.scale(i32::from(self.face.ascender()));
        let descent = self.scale(i32::from(self.face.descender()));
        let cap_height = self
            .face
            .capital_height()
            .map_or(ascent, |h| self.scale(i32::from(h)));
        dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => self.asset.base_font(),
            // Nonsymbolic.
            "Flags" => Object::Integer(32),
            "FontBBox" => vec![
                Object::Integer(self.scale(i32::from(bbox.x_min))),
                Object::Integer(self.scale(i32::from(bbox.y_min))),
                Object::Integer(self.scale(i32::from(bbox.x_max))),
                Object::Integer(self.scale(i32::from(bbox.y_max))),
            ],
            "ItalicAngle" => Object::Integer(0),
            "Ascent" => Object::Integer(ascent),
            "Descent" => Object::Integer(descent),
            "CapHeight" => Object::Integer(cap_height),
            "StemV" => Object::Integer(80),
            "FontFile2" => font_file,
        }
    }

    /// Write the font objects into `doc`, returning the Type0 font dictionary id.
    ///
    /// Call after every string has been encoded; glyphs encoded later have no
    /// width or Unicode entry.
    pub fn embed(&self, doc: &mut Document) -> Result<ObjectId, DocumentError> {
        let font_file = doc.add_object(self.font_file()?);
        let descriptor = doc.add_object(self.descriptor(font_file));
        let to_unicode = doc.add_object(Stream::new(Dictionary::new(), self.to_unicode_cmap()));

        let base_font = self.asset.base_font();
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => base_font,
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => Object::Integer(0),
            },
            "FontDescriptor" => descriptor,
            "DW" => Object::Integer(1000),
            "W" => self.widths(),
            "CIDToGIDMap" => "Identity",
        });

        Ok(doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => base_font,
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
            "ToUnicode" => to_unicode,
        }))
    }
}
