//! Name and duration formatting shared by the exporters.

/// How dotted type names are rendered in exporter output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypeNameFormat {
    /// The full dotted name, untouched.
    #[default]
    Full,
    /// Only the final segment: `android.os.Looper` becomes `Looper`.
    SimpleName,
    /// Leading segments trimmed to one character each, so names stay
    /// readable without bloating the payload:
    /// `com.android.internal.os.RuntimeInit` becomes `c.a.i.o.RuntimeInit`.
    ShortPath,
}

impl TypeNameFormat {
    pub fn write(self, out: &mut String, type_name: &str) {
        match self {
            TypeNameFormat::Full => out.push_str(type_name),
            TypeNameFormat::SimpleName => {
                let start = type_name.rfind('.').map_or(0, |dot| dot + 1);
                out.push_str(&type_name[start..]);
            }
            TypeNameFormat::ShortPath => {
                let mut rest = type_name;
                while let Some(dot) = rest.find('.') {
                    if let Some(first) = rest.chars().next() {
                        out.push(first);
                    }
                    out.push('.');
                    rest = &rest[dot + 1..];
                }
                out.push_str(rest);
            }
        }
    }

    /// Append `Type.method` with the type rendered per this format.
    pub fn write_frame_name(self, out: &mut String, type_name: &str, method_name: &str) {
        self.write(out, type_name);
        out.push('.');
        out.push_str(method_name);
    }

    pub fn frame_name(self, type_name: &str, method_name: &str) -> String {
        let mut out = String::with_capacity(type_name.len() + method_name.len() + 1);
        self.write_frame_name(&mut out, type_name, method_name);
        out
    }
}

/// Append a compact human rendering of a nanosecond duration.
///
/// Tuned for breadcrumb-sized payloads rather than precision: whole
/// milliseconds once a value is large enough to matter, one or two
/// significant sub-millisecond digits below that, raw nanoseconds only for
/// the tiny values where they are the interesting part.
pub fn write_time_ns(out: &mut String, time_ns: u64) {
    if time_ns > 1_000_000 {
        // 12ms
        out.push_str(&(time_ns / 1_000_000).to_string());
        out.push('m');
    } else if time_ns > 100_000 {
        // .9ms instead of full ns detail
        out.push('.');
        out.push_str(&(time_ns / 100_000).to_string());
        out.push('m');
    } else if time_ns > 10_000 {
        // .09ms instead of full ns detail
        out.push_str(".0");
        out.push_str(&(time_ns / 10_000).to_string());
        out.push('m');
    } else {
        out.push_str(&time_ns.to_string());
        out.push('n');
    }
    out.push('s');
}

pub fn format_time_ns(time_ns: u64) -> String {
    let mut out = String::new();
    write_time_ns(&mut out, time_ns);
    out
}
