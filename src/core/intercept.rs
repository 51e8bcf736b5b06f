//! MG-008: Interceptor renderer — polymorphic codec for an interface type.
//!
//! Wire format of an interface value: a 2-element array of the
//! implementer's tag as a decimal string, then the implementer's payload.

use super::directive::{Directive, InterceptDirective, ShimDirective, ShimMode};
use super::directives::Directives;
use super::state::State;
use super::types::{primitive, Type, TypeName};
use crate::packages::PackageSet;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

static MAPPER_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[/.\-]").unwrap());

/// An interface discovered as a field type.
#[derive(Debug, Clone)]
pub struct Iface {
    pub name: TypeName,
    /// Implementers; `Pointer(Named)` when only `*T` implements.
    pub types: IndexMap<TypeName, Type>,
    /// Referring packages that need an interceptor, in discovery order.
    pub in_packages: Vec<String>,
}

impl Iface {
    pub fn new(name: TypeName, types: IndexMap<TypeName, Type>) -> Self {
        Iface {
            name,
            types,
            in_packages: Vec::new(),
        }
    }

    pub fn add_package(&mut self, pkg: &str) {
        if !self.in_packages.iter().any(|p| p == pkg) {
            self.in_packages.push(pkg.to_string());
        }
    }
}

/// One `case` of the generated switches.
#[derive(Debug, Clone)]
struct Entry {
    id: u32,
    import_name: String,
    pointer: bool,
    shim: Option<ShimDirective>,
    shim_primitive: String,
}

#[derive(Debug, Clone)]
pub struct RenderedInterceptor {
    pub source: String,
    pub directive: Directive,
    pub cases: usize,
}

/// Identifier stem for the generated symbols: separators become `_`, the
/// result is trimmed of `_` and its first letter lowercased.
pub fn mapper_name(iface: &TypeName) -> String {
    let replaced = MAPPER_SEPARATORS.replace_all(&iface.to_string(), "_").to_string();
    let trimmed = replaced.trim_matches('_');
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn build_entries(
    tpset: &dyn PackageSet,
    pkg: &str,
    directives: &Directives,
    state: &State,
    iface: &Iface,
) -> Result<Vec<Entry>, String> {
    let mut entries = Vec::with_capacity(iface.types.len());
    for (tn, ty) in &iface.types {
        if !tn.is_exported() || directives.is_ignored(tn) {
            continue;
        }
        if tpset.package_name(&tn.package_path) == "main" && tn.package_path != pkg {
            return Err(format!(
                "cannot intercept {} in {}: implementer {} is declared in package main",
                iface.name, pkg, tn
            ));
        }
        let id = state.id(tn).ok_or_else(|| {
            format!(
                "id not found for package {}, type {}, iface {}",
                pkg, tn, iface.name
            )
        })?;
        let shim = directives.shim(tn).cloned();
        let shim_primitive = match &shim {
            Some(s) => primitive(&s.as_type)
                .map(|p| p.codec_name().to_string())
                .ok_or_else(|| {
                    format!("shim for {} uses unsupported primitive {}", tn, s.as_type)
                })?,
            None => String::new(),
        };
        entries.push(Entry {
            id,
            import_name: tpset.local_import_name(tn, pkg)?,
            pointer: matches!(ty, Type::Pointer(_)),
            shim,
            shim_primitive,
        });
    }
    entries.sort_by_key(|e| e.id);
    Ok(entries)
}

/// Render the interceptor for `iface` into `pkg`, together with the
/// `intercept` directive that routes the interface through it.
pub fn render_interceptor(
    tpset: &dyn PackageSet,
    pkg: &str,
    directives: &Directives,
    state: &State,
    iface: &Iface,
) -> Result<RenderedInterceptor, String> {
    let entries = build_entries(tpset, pkg, directives, state, iface)?;

    let mapper = mapper_name(&iface.name);
    if mapper.is_empty() {
        return Err(format!(
            "mapper name was empty for package {}, iface {}",
            pkg, iface.name
        ));
    }
    let instance = format!("{}Instance", mapper);
    let interceptor = format!("{}Interceptor", mapper);
    let out = tpset.local_import_name(&iface.name, pkg)?;

    let mut lines: Vec<String> = Vec::new();
    lines.push(String::new());
    lines.push(format!("var {} = &{}{{}}", instance, mapper));
    lines.push(String::new());
    lines.push(format!(
        "func {}() *{} {{ return {} }}",
        interceptor, mapper, instance
    ));
    lines.push(String::new());
    lines.push(format!("type {} struct {{}}", mapper));
    lines.push(String::new());
    decode_msg(&mut lines, &mapper, &out, &entries);
    lines.push(String::new());
    unmarshal_msg(&mut lines, &mapper, &out, &entries);
    lines.push(String::new());
    encode_msg(&mut lines, &mapper, &out, &entries);
    lines.push(String::new());
    marshal_msg(&mut lines, &mapper, &out, &entries);
    lines.push(String::new());
    msgsize(&mut lines, &mapper, &out);
    lines.push(String::new());

    Ok(RenderedInterceptor {
        source: lines.join("\n"),
        directive: Directive::Intercept(InterceptDirective {
            type_name: out,
            using: interceptor,
        }),
        cases: entries.len(),
    })
}

fn read_tag(lines: &mut Vec<String>, bytes: bool) {
    let (header, string) = if bytes {
        (
            "\t\tsz, o, err = msgp.ReadArrayHeaderBytes(o)",
            "\t\ts, o, err = msgp.ReadStringBytes(o)",
        )
    } else {
        ("\t\tsz, err = dc.ReadArrayHeader()", "\t\ts, err = dc.ReadString()")
    };
    lines.push("\t\tvar sz uint32".to_string());
    lines.push(header.to_string());
    lines.push("\t\tif err != nil {".to_string());
    lines.push("\t\t\treturn".to_string());
    lines.push("\t\t}".to_string());
    lines.push("\t\tif sz != 2 {".to_string());
    lines.push("\t\t\terr = msgp.ArrayError{Wanted: 2, Got: sz}".to_string());
    lines.push("\t\t\treturn".to_string());
    lines.push("\t\t}".to_string());
    lines.push("\t\t// tags travel as strings: integer widths differ between clients".to_string());
    lines.push("\t\tvar s string".to_string());
    lines.push("\t\tvar i int64".to_string());
    lines.push(string.to_string());
    lines.push("\t\tif err != nil {".to_string());
    lines.push("\t\t\treturn".to_string());
    lines.push("\t\t}".to_string());
    lines.push("\t\ti, err = strconv.ParseInt(s, 10, 64)".to_string());
    lines.push("\t\tif err != nil {".to_string());
    lines.push("\t\t\treturn".to_string());
    lines.push("\t\t}".to_string());
}

fn shim_from(lines: &mut Vec<String>, shim: &ShimDirective) {
    match shim.mode {
        ShimMode::Convert => lines.push(format!("\t\t\tt, err = {}(as)", shim.from_func)),
        ShimMode::Cast => lines.push(format!("\t\t\tt = {}(as)", shim.from_func)),
    }
}

fn decode_msg(lines: &mut Vec<String>, mapper: &str, out: &str, entries: &[Entry]) {
    lines.push(format!(
        "func (m *{}) DecodeMsg(dc *msgp.Reader) (t {}, err error) {{",
        mapper, out
    ));
    lines.push("\tif dc.IsNil() {".to_string());
    lines.push("\t\terr = dc.ReadNil()".to_string());
    lines.push("\t} else {".to_string());
    read_tag(lines, false);
    lines.push("\t\tswitch i {".to_string());
    for e in entries {
        lines.push(format!("\t\tcase {}:", e.id));
        match &e.shim {
            Some(shim) => {
                lines.push(format!("\t\t\tvar as {}", shim.as_type));
                lines.push(format!(
                    "\t\t\tif as, err = dc.Read{}(); err != nil {{",
                    e.shim_primitive
                ));
                lines.push("\t\t\t\treturn".to_string());
                lines.push("\t\t\t}".to_string());
                shim_from(lines, shim);
            }
            None => {
                let amp = if e.pointer { "&" } else { "" };
                lines.push(format!("\t\t\tv := {}{}{{}}", amp, e.import_name));
                lines.push("\t\t\tif err = v.DecodeMsg(dc); err != nil {".to_string());
                lines.push("\t\t\t\treturn".to_string());
                lines.push("\t\t\t}".to_string());
                lines.push("\t\t\tt = v".to_string());
            }
        }
    }
    lines.push("\t\tdefault:".to_string());
    lines.push(format!(
        "\t\t\terr = fmt.Errorf(\"{}: unknown msg kind %d\", i)",
        out
    ));
    lines.push("\t\t}".to_string());
    lines.push("\t}".to_string());
    lines.push("\treturn".to_string());
    lines.push("}".to_string());
}

fn unmarshal_msg(lines: &mut Vec<String>, mapper: &str, out: &str, entries: &[Entry]) {
    lines.push(format!(
        "func (m *{}) UnmarshalMsg(bts []byte) (t {}, o []byte, err error) {{",
        mapper, out
    ));
    lines.push("\to = bts".to_string());
    lines.push("\tif msgp.IsNil(bts) {".to_string());
    lines.push("\t\to, err = msgp.ReadNilBytes(o)".to_string());
    lines.push("\t} else {".to_string());
    read_tag(lines, true);
    lines.push("\t\tswitch i {".to_string());
    for e in entries {
        lines.push(format!("\t\tcase {}:", e.id));
        match &e.shim {
            Some(shim) => {
                lines.push(format!("\t\t\tvar as {}", shim.as_type));
                lines.push(format!(
                    "\t\t\tif as, o, err = msgp.Read{}Bytes(o); err != nil {{",
                    e.shim_primitive
                ));
                lines.push("\t\t\t\treturn".to_string());
                lines.push("\t\t\t}".to_string());
                shim_from(lines, shim);
            }
            None => {
                let amp = if e.pointer { "&" } else { "" };
                lines.push(format!("\t\t\tv := {}{}{{}}", amp, e.import_name));
                lines.push("\t\t\tt = v".to_string());
                lines.push("\t\t\to, err = v.UnmarshalMsg(o)".to_string());
            }
        }
    }
    lines.push("\t\tdefault:".to_string());
    lines.push(format!(
        "\t\t\terr = fmt.Errorf(\"{}: unknown msg kind %d\", i)",
        out
    ));
    lines.push("\t\t}".to_string());
    lines.push("\t}".to_string());
    lines.push("\treturn".to_string());
    lines.push("}".to_string());
}

fn case_type(e: &Entry) -> String {
    if e.pointer {
        format!("*{}", e.import_name)
    } else {
        e.import_name.clone()
    }
}

fn encode_msg(lines: &mut Vec<String>, mapper: &str, out: &str, entries: &[Entry]) {
    lines.push(format!(
        "func (m *{}) EncodeMsg(t {}, en *msgp.Writer) (err error) {{",
        mapper, out
    ));
    lines.push("\tif t == nil {".to_string());
    lines.push("\t\treturn en.WriteNil()".to_string());
    lines.push("\t}".to_string());
    lines.push("\t// array header, size 2".to_string());
    lines.push("\terr = en.Append(0x92)".to_string());
    lines.push("\tif err != nil {".to_string());
    lines.push("\t\treturn err".to_string());
    lines.push("\t}".to_string());
    lines.push("\tswitch t := t.(type) {".to_string());
    for e in entries {
        lines.push(format!("\tcase {}:", case_type(e)));
        lines.push(format!(
            "\t\tif err = en.WriteString(\"{}\"); err != nil {{",
            e.id
        ));
        lines.push("\t\t\treturn".to_string());
        lines.push("\t\t}".to_string());
        match &e.shim {
            Some(shim) if shim.mode == ShimMode::Convert => {
                lines.push(format!("\t\tvar tmp {}", shim.as_type));
                lines.push(format!(
                    "\t\tif tmp, err = {}(t); err != nil {{",
                    shim.to_func
                ));
                lines.push("\t\t\treturn".to_string());
                lines.push("\t\t}".to_string());
                lines.push(format!("\t\terr = en.Write{}(tmp)", e.shim_primitive));
            }
            Some(shim) => {
                lines.push(format!(
                    "\t\terr = en.Write{}({}(t))",
                    e.shim_primitive, shim.as_type
                ));
            }
            None => lines.push("\t\terr = t.EncodeMsg(en)".to_string()),
        }
    }
    lines.push("\tdefault:".to_string());
    lines.push(format!(
        "\t\terr = fmt.Errorf(\"{} unknown msg %T\", t)",
        out
    ));
    lines.push("\t}".to_string());
    lines.push("\treturn".to_string());
    lines.push("}".to_string());
}

fn marshal_msg(lines: &mut Vec<String>, mapper: &str, out: &str, entries: &[Entry]) {
    lines.push(format!(
        "func (m *{}) MarshalMsg(t {}, b []byte) (o []byte, err error) {{",
        mapper, out
    ));
    lines.push("\to = b".to_string());
    lines.push("\tif t == nil {".to_string());
    lines.push("\t\to = msgp.AppendNil(o)".to_string());
    lines.push("\t\treturn".to_string());
    lines.push("\t}".to_string());
    lines.push("\t// array header, size 2".to_string());
    lines.push("\to = append(o, 0x92)".to_string());
    lines.push("\tswitch t := t.(type) {".to_string());
    for e in entries {
        lines.push(format!("\tcase {}:", case_type(e)));
        lines.push(format!("\t\to = msgp.AppendString(o, \"{}\")", e.id));
        match &e.shim {
            Some(shim) if shim.mode == ShimMode::Convert => {
                lines.push(format!("\t\tvar tmp {}", shim.as_type));
                lines.push(format!(
                    "\t\tif tmp, err = {}(t); err != nil {{",
                    shim.to_func
                ));
                lines.push("\t\t\treturn".to_string());
                lines.push("\t\t}".to_string());
                lines.push(format!(
                    "\t\to = msgp.Append{}(o, tmp)",
                    e.shim_primitive
                ));
            }
            Some(shim) => {
                lines.push(format!(
                    "\t\to = msgp.Append{}(o, {}(t))",
                    e.shim_primitive, shim.as_type
                ));
            }
            None => lines.push("\t\to, err = t.MarshalMsg(o)".to_string()),
        }
    }
    lines.push("\tdefault:".to_string());
    lines.push(format!(
        "\t\terr = fmt.Errorf(\"{} unknown msg %T\", t)",
        out
    ));
    lines.push("\t}".to_string());
    lines.push("\treturn".to_string());
    lines.push("}".to_string());
}

fn msgsize(lines: &mut Vec<String>, mapper: &str, out: &str) {
    lines.push(format!("func (m *{}) Msgsize(t {}) (s int) {{", mapper, out));
    lines.push("\tswitch t := t.(type) {".to_string());
    lines.push("\tcase msgp.Sizer:".to_string());
    lines.push("\t\treturn t.Msgsize()".to_string());
    lines.push("\tdefault:".to_string());
    lines.push("\t\treturn msgp.GuessSize(t)".to_string());
    lines.push("\t}".to_string());
    lines.push("}".to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::manifest::ManifestPackageSet;
    use crate::packages::testutil;
    use regex::Regex;
    use std::path::Path;

    fn shapes_iface(set: &ManifestPackageSet) -> Iface {
        let name = TypeName::new("example.com/shapes", "Shape");
        let types = set.find_implementers(&name).unwrap();
        let mut iface = Iface::new(name, types);
        iface.add_package("example.com/app");
        iface
    }

    fn seeded_state(iface: &Iface) -> State {
        let mut state = State::new();
        for tn in iface.types.keys() {
            if tn.is_exported() {
                state.ensure_type(tn).unwrap();
            }
        }
        state
    }

    #[test]
    fn test_mg008_mapper_name() {
        assert_eq!(
            mapper_name(&TypeName::new("example.com/shapes", "Shape")),
            "example_com_shapes_Shape"
        );
        assert_eq!(mapper_name(&TypeName::new("Foo/p", "I")), "foo_p_I");
        assert_eq!(mapper_name(&TypeName::new("my-mod/x", "I")), "my_mod_x_I");
    }

    #[test]
    fn test_mg008_add_package_dedup() {
        let mut iface = Iface::new(TypeName::new("p", "I"), IndexMap::new());
        iface.add_package("a");
        iface.add_package("b");
        iface.add_package("a");
        assert_eq!(iface.in_packages, vec!["a", "b"]);
    }

    #[test]
    fn test_mg008_render_symbols_and_directive() {
        let set = testutil::fixture(Path::new("/src"));
        let iface = shapes_iface(&set);
        let state = seeded_state(&iface);
        let dctvs = Directives::new("example.com/app");
        let r = render_interceptor(&set, "example.com/app", &dctvs, &state, &iface).unwrap();

        assert!(r
            .source
            .contains("var example_com_shapes_ShapeInstance = &example_com_shapes_Shape{}"));
        assert!(r.source.contains(
            "func example_com_shapes_ShapeInterceptor() *example_com_shapes_Shape { return example_com_shapes_ShapeInstance }"
        ));
        assert!(r
            .source
            .contains("func (m *example_com_shapes_Shape) DecodeMsg(dc *msgp.Reader) (t shapes.Shape, err error) {"));
        assert!(r.source.contains("func (m *example_com_shapes_Shape) Msgsize(t shapes.Shape) (s int) {"));
        assert!(r.source.contains("err = fmt.Errorf(\"shapes.Shape: unknown msg kind %d\", i)"));
        assert!(r.source.contains("err = fmt.Errorf(\"shapes.Shape unknown msg %T\", t)"));
        // Square needs a pointer receiver
        assert!(r.source.contains("v := &shapes.Square{}"));
        assert!(r.source.contains("\tcase *shapes.Square:"));
        assert!(r.source.contains("v := shapes.Circle{}"));
        // unexported implementers never appear
        assert!(!r.source.contains("hidden"));
        assert_eq!(r.cases, 3);
        assert_eq!(
            r.directive,
            Directive::Intercept(InterceptDirective {
                type_name: "shapes.Shape".to_string(),
                using: "example_com_shapes_ShapeInterceptor".to_string(),
            })
        );
    }

    #[test]
    fn test_mg008_cases_sorted_by_tag() {
        let set = testutil::fixture(Path::new("/src"));
        let iface = shapes_iface(&set);
        let mut state = State::from_json(
            r#"{"Types": {"example.com/shapes.Square": 2, "example.com/shapes.Point": 5}}"#,
        )
        .unwrap();
        state.ensure_type(&TypeName::new("example.com/shapes", "Circle")).unwrap();
        let dctvs = Directives::new("example.com/app");
        let r = render_interceptor(&set, "example.com/app", &dctvs, &state, &iface).unwrap();

        let case = Regex::new(r"(?m)^\t\tcase (\d+):$").unwrap();
        let decode_ids: Vec<&str> = case
            .captures_iter(&r.source)
            .map(|c| c.get(1).unwrap().as_str())
            .collect();
        // DecodeMsg then UnmarshalMsg
        assert_eq!(decode_ids, vec!["2", "5", "6", "2", "5", "6"]);
    }

    #[test]
    fn test_mg008_encode_cases_match_decode_cases() {
        let set = testutil::fixture(Path::new("/src"));
        let iface = shapes_iface(&set);
        let state = seeded_state(&iface);
        let dctvs = Directives::new("example.com/app");
        let r = render_interceptor(&set, "example.com/app", &dctvs, &state, &iface).unwrap();

        let decode = Regex::new(r"(?m)^\t\tcase (\d+):$").unwrap();
        let encode = Regex::new(r#"en\.WriteString\("(\d+)"\)"#).unwrap();
        let marshal = Regex::new(r#"msgp\.AppendString\(o, "(\d+)"\)"#).unwrap();
        let collect = |re: &Regex| -> Vec<String> {
            re.captures_iter(&r.source)
                .map(|c| c[1].to_string())
                .collect()
        };
        let decoded = collect(&decode);
        let encoded = collect(&encode);
        let marshaled = collect(&marshal);
        assert_eq!(encoded.len(), 3);
        assert_eq!(encoded, marshaled);
        for id in &encoded {
            assert_eq!(decoded.iter().filter(|d| *d == id).count(), 2);
        }
    }

    #[test]
    fn test_mg008_shimmed_implementer() {
        let set = testutil::fixture(Path::new("/src"));
        let iface = shapes_iface(&set);
        let state = seeded_state(&iface);
        let mut dctvs = Directives::new("example.com/app");
        dctvs
            .add(
                &set,
                Directive::Shim(ShimDirective {
                    type_name: "example.com/shapes.Point".to_string(),
                    as_type: "float64".to_string(),
                    to_func: "float64".to_string(),
                    from_func: "shapes.Point".to_string(),
                    mode: ShimMode::Cast,
                }),
            )
            .unwrap();
        let r = render_interceptor(&set, "example.com/app", &dctvs, &state, &iface).unwrap();
        assert!(r.source.contains("if as, err = dc.ReadFloat64(); err != nil {"));
        assert!(r.source.contains("t = shapes.Point(as)"));
        assert!(r.source.contains("err = en.WriteFloat64(float64(t))"));
        assert!(r.source.contains("o = msgp.AppendFloat64(o, float64(t))"));
    }

    #[test]
    fn test_mg008_convert_shim() {
        let set = testutil::fixture(Path::new("/src"));
        let iface = shapes_iface(&set);
        let state = seeded_state(&iface);
        let mut dctvs = Directives::new("example.com/app");
        dctvs
            .add(
                &set,
                Directive::Shim(ShimDirective {
                    type_name: "example.com/shapes.Point".to_string(),
                    as_type: "string".to_string(),
                    to_func: "pointToString".to_string(),
                    from_func: "stringToPoint".to_string(),
                    mode: ShimMode::Convert,
                }),
            )
            .unwrap();
        let r = render_interceptor(&set, "example.com/app", &dctvs, &state, &iface).unwrap();
        assert!(r.source.contains("t, err = stringToPoint(as)"));
        assert!(r.source.contains("\t\tvar tmp string"));
        assert!(r.source.contains("if tmp, err = pointToString(t); err != nil {"));
        assert!(r.source.contains("err = en.WriteString(tmp)"));
    }

    #[test]
    fn test_mg008_ignored_implementer_skipped() {
        let set = testutil::fixture(Path::new("/src"));
        let iface = shapes_iface(&set);
        let state = seeded_state(&iface);
        let mut dctvs = Directives::new("example.com/app");
        dctvs
            .add(&set, Directive::Ignore(vec!["shapes.Circle".to_string()]))
            .unwrap();
        let r = render_interceptor(&set, "example.com/app", &dctvs, &state, &iface).unwrap();
        assert!(!r.source.contains("shapes.Circle"));
        assert_eq!(r.cases, 2);
    }

    #[test]
    fn test_mg008_missing_tag() {
        let set = testutil::fixture(Path::new("/src"));
        let iface = shapes_iface(&set);
        let dctvs = Directives::new("example.com/app");
        let err = render_interceptor(&set, "example.com/app", &dctvs, &State::new(), &iface)
            .unwrap_err();
        assert!(err.starts_with("id not found for package example.com/app"));
    }

    #[test]
    fn test_mg008_main_package_implementers() {
        let yaml = r#"
packages:
  example.com/cmd/tool:
    name: main
    dir: cmd/tool
    types:
      Msg: { interface: [Kind] }
      Ping:
        fields: [{ name: N, type: int }]
        methods: [{ name: Kind }]
      Holder:
        fields: [{ name: M, type: Msg }]
  example.com/lib:
    dir: lib
    imports: [example.com/cmd/tool]
    types:
      Wrap:
        fields: [{ name: M, type: tool.Msg }]
"#;
        let set = ManifestPackageSet::from_yaml(yaml, Path::new("/")).unwrap();
        let name = TypeName::new("example.com/cmd/tool", "Msg");
        let iface = Iface::new(name.clone(), set.find_implementers(&name).unwrap());
        let mut state = State::new();
        state.ensure_type(&TypeName::new("example.com/cmd/tool", "Ping")).unwrap();

        let local = Directives::new("example.com/cmd/tool");
        let r = render_interceptor(&set, "example.com/cmd/tool", &local, &state, &iface).unwrap();
        assert!(r.source.contains("v := Ping{}"));

        let remote = Directives::new("example.com/lib");
        let err = render_interceptor(&set, "example.com/lib", &remote, &state, &iface).unwrap_err();
        assert!(err.contains("declared in package main"));
    }

    #[test]
    fn test_mg008_unsupported_shim_primitive() {
        let set = testutil::fixture(Path::new("/src"));
        let iface = shapes_iface(&set);
        let state = seeded_state(&iface);
        let mut dctvs = Directives::new("example.com/app");
        dctvs
            .add(
                &set,
                Directive::Shim(ShimDirective {
                    type_name: "example.com/shapes.Point".to_string(),
                    as_type: "[]string".to_string(),
                    to_func: "a".to_string(),
                    from_func: "b".to_string(),
                    mode: ShimMode::Cast,
                }),
            )
            .unwrap();
        let err = render_interceptor(&set, "example.com/app", &dctvs, &state, &iface).unwrap_err();
        assert!(err.contains("unsupported primitive []string"));
    }
}
