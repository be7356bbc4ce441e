//! The runtime helper catalog.
//!
//! Every fragment of support C the emitter can pull in lives here, keyed
//! for the dependency registry. Call sites and helper bodies are emitted
//! independently, so the helper names and signatures in these fragments
//! are a fixed contract; changing one silently breaks generated call
//! sites.
//!
//! Target-facing decisions baked into the helpers:
//! - `ARRAY_PUSH` grows capacity by exactly one element per push. The
//!   targets have kilobytes of RAM; exact capacity beats amortized
//!   over-allocation.
//! - `ARRAY_POP` on an empty array yields `0` and leaves the length at
//!   `0`, matching the source language's saturating semantics.
//! - String positions count UTF-16 code units, derived from UTF-8 lead
//!   bytes (a 4-byte sequence advances the counter by 2).

use crate::deps::Fragment;

/// Well-known fragment keys, used by the resolvers.
pub mod keys {
    pub const INCLUDE_STDINT: &str = "include_stdint";
    pub const INCLUDE_STDIO: &str = "include_stdio";
    pub const INCLUDE_STDLIB: &str = "include_stdlib";
    pub const INCLUDE_STRING: &str = "include_string";
    pub const ARR_INT16: &str = "arr_int16_t";
    pub const ARR_STR: &str = "arr_str";
    pub const ARRAY_MACROS: &str = "array_macros";
    pub const ARRAY_INDEX_OF: &str = "array_index_of";
    pub const FIXED_ARRAY_MACROS: &str = "fixed_array_macros";
    pub const STR_DUP: &str = "str_dup";
    pub const STR_UNITS: &str = "str_units";
    pub const STR_LEN: &str = "str_len";
    pub const STR_POS: &str = "str_pos";
    pub const STR_RPOS: &str = "str_rpos";
    pub const STR_SLICE: &str = "str_slice";
    pub const STR_CAT: &str = "str_cat";
    pub const STR_CMP: &str = "str_int16_t_cmp";
    pub const STR_NUM_CAT: &str = "str_int16_t_cat";
    pub const NUM_STR_CAT: &str = "int16_t_str_cat";
    pub const DICT: &str = "dict";
    pub const DICT_FREE: &str = "dict_free";
    pub const REGEX: &str = "regex";
    pub const DISCARD: &str = "discard16";
    pub const ITER: &str = "iter16";
}

/// The full catalog handed to [`crate::deps::DependencyRegistry::new`].
pub const CATALOG: &[Fragment] = &[
    Fragment {
        key: keys::INCLUDE_STDINT,
        unique: true,
        requires: &[],
        code: "#include <stdint.h>\n",
    },
    Fragment {
        key: keys::INCLUDE_STDIO,
        unique: true,
        requires: &[],
        code: "#include <stdio.h>\n",
    },
    Fragment {
        key: keys::INCLUDE_STDLIB,
        unique: true,
        requires: &[],
        code: "#include <stdlib.h>\n",
    },
    Fragment {
        key: keys::INCLUDE_STRING,
        unique: true,
        requires: &[],
        code: "#include <string.h>\n",
    },
    Fragment {
        key: keys::ARR_INT16,
        unique: true,
        requires: &[keys::INCLUDE_STDINT],
        code: "\
typedef struct {
    int16_t *data;
    int16_t length;
    int16_t capacity;
} arr_int16_t_t;
",
    },
    Fragment {
        key: keys::ARR_STR,
        unique: true,
        requires: &[keys::INCLUDE_STDINT],
        code: "\
typedef struct {
    char **data;
    int16_t length;
    int16_t capacity;
} arr_str_t;
",
    },
    Fragment {
        key: keys::ARRAY_MACROS,
        unique: true,
        requires: &[keys::INCLUDE_STDLIB, keys::INCLUDE_STRING],
        code: "\
#define ARRAY_CREATE(a) do { \\
    (a).data = NULL; (a).length = 0; (a).capacity = 0; \\
} while (0)
#define ARRAY_PUSH(a, v) do { \\
    (a).capacity = (int16_t)((a).capacity + 1); \\
    (a).data = realloc((a).data, (size_t)(a).capacity * sizeof(*(a).data)); \\
    (a).data[(a).length++] = (v); \\
} while (0)
#define ARRAY_POP(a, out) do { \\
    if ((a).length > 0) { (out) = (a).data[--(a).length]; } \\
    else { (out) = 0; } \\
} while (0)
#define ARRAY_INSERT(a, i, v) do { \\
    (a).capacity = (int16_t)((a).capacity + 1); \\
    (a).data = realloc((a).data, (size_t)(a).capacity * sizeof(*(a).data)); \\
    memmove(&(a).data[(i) + 1], &(a).data[(i)], \\
            (size_t)((a).length - (i)) * sizeof(*(a).data)); \\
    (a).data[(i)] = (v); \\
    (a).length++; \\
} while (0)
#define ARRAY_REMOVE(a, i, out) do { \\
    if ((a).length > 0) { \\
        (out) = (a).data[(i)]; \\
        memmove(&(a).data[(i)], &(a).data[(i) + 1], \\
                (size_t)((a).length - (i) - 1) * sizeof(*(a).data)); \\
        (a).length--; \\
    } else { (out) = 0; } \\
} while (0)
",
    },
    Fragment {
        key: keys::ARRAY_INDEX_OF,
        unique: true,
        requires: &[],
        code: "\
#define ARRAY_INDEX_OF(a, v, out) do { \\
    int16_t i_; \\
    (out) = -1; \\
    for (i_ = 0; i_ < (a).length; i_++) { \\
        if ((a).data[i_] == (v)) { (out) = i_; break; } \\
    } \\
} while (0)
",
    },
    Fragment {
        key: keys::FIXED_ARRAY_MACROS,
        unique: true,
        requires: &[keys::INCLUDE_STDINT],
        code: "\
#define FIXED_POP(a, len, out) do { \\
    if ((len) > 0) { (len) = (int16_t)((len) - 1); (out) = (a)[(len)]; } \\
    else { (out) = 0; } \\
} while (0)
#define FIXED_SHIFT(a, len, out) do { \\
    int16_t i_; \\
    if ((len) > 0) { \\
        (out) = (a)[0]; \\
        for (i_ = 1; i_ < (len); i_++) { (a)[i_ - 1] = (a)[i_]; } \\
        (len) = (int16_t)((len) - 1); \\
    } else { (out) = 0; } \\
} while (0)
#define FIXED_INDEX_OF(a, len, v, out) do { \\
    int16_t i_; \\
    (out) = -1; \\
    for (i_ = 0; i_ < (len); i_++) { \\
        if ((a)[i_] == (v)) { (out) = i_; break; } \\
    } \\
} while (0)
",
    },
    Fragment {
        key: keys::STR_DUP,
        unique: true,
        requires: &[keys::INCLUDE_STDLIB, keys::INCLUDE_STRING],
        code: "\
static char *str_dup(const char *s)
{
    size_t n = strlen(s) + 1;
    char *copy = malloc(n);
    memcpy(copy, s, n);
    return copy;
}
",
    },
    Fragment {
        key: keys::STR_UNITS,
        unique: true,
        requires: &[keys::INCLUDE_STDINT],
        code: "\
/* Bytes in the UTF-8 sequence starting with lead byte c. */
static int16_t str_seq_bytes(unsigned char c)
{
    if (c < 0x80) return 1;
    if (c < 0xE0) return 2;
    if (c < 0xF0) return 3;
    return 4;
}

/* UTF-16 code units the sequence contributes. */
static int16_t str_seq_units(unsigned char c)
{
    return (int16_t)(str_seq_bytes(c) == 4 ? 2 : 1);
}
",
    },
    Fragment {
        key: keys::STR_LEN,
        unique: true,
        requires: &[keys::STR_UNITS],
        code: "\
static int16_t str_len(const char *s)
{
    int16_t units = 0;
    while (*s) {
        units = (int16_t)(units + str_seq_units((unsigned char)*s));
        s += str_seq_bytes((unsigned char)*s);
    }
    return units;
}
",
    },
    Fragment {
        key: keys::STR_POS,
        unique: true,
        requires: &[keys::STR_UNITS, keys::INCLUDE_STRING],
        code: "\
static int16_t str_pos(const char *hay, const char *needle)
{
    int16_t units = 0;
    size_t n = strlen(needle);
    while (*hay) {
        if (strncmp(hay, needle, n) == 0) return units;
        units = (int16_t)(units + str_seq_units((unsigned char)*hay));
        hay += str_seq_bytes((unsigned char)*hay);
    }
    return (int16_t)(n == 0 ? units : -1);
}
",
    },
    Fragment {
        key: keys::STR_RPOS,
        unique: true,
        requires: &[keys::STR_UNITS, keys::INCLUDE_STRING],
        code: "\
static int16_t str_rpos(const char *hay, const char *needle)
{
    int16_t units = 0;
    int16_t found = -1;
    size_t n = strlen(needle);
    while (*hay) {
        if (strncmp(hay, needle, n) == 0) found = units;
        units = (int16_t)(units + str_seq_units((unsigned char)*hay));
        hay += str_seq_bytes((unsigned char)*hay);
    }
    if (n == 0) return units;
    return found;
}
",
    },
    Fragment {
        key: keys::STR_SLICE,
        unique: true,
        requires: &[keys::STR_UNITS, keys::INCLUDE_STDLIB, keys::INCLUDE_STRING],
        code: "\
/* Substring by code-unit positions [start, end); always fresh heap. */
static char *str_slice(const char *s, int16_t start, int16_t end)
{
    int16_t units = 0;
    const char *from = NULL;
    const char *to = NULL;
    char *out;
    size_t len;
    while (*s) {
        if (units >= start && from == NULL) from = s;
        if (units >= end) { to = s; break; }
        units = (int16_t)(units + str_seq_units((unsigned char)*s));
        s += str_seq_bytes((unsigned char)*s);
    }
    if (from == NULL) from = s;
    if (to == NULL) to = s;
    len = (size_t)(to - from);
    out = malloc(len + 1);
    memcpy(out, from, len);
    out[len] = '\\0';
    return out;
}
",
    },
    Fragment {
        key: keys::STR_CAT,
        unique: true,
        requires: &[keys::INCLUDE_STDLIB, keys::INCLUDE_STRING],
        code: "\
static char *str_cat(const char *a, const char *b)
{
    size_t la = strlen(a);
    size_t lb = strlen(b);
    char *out = malloc(la + lb + 1);
    memcpy(out, a, la);
    memcpy(out + la, b, lb + 1);
    return out;
}
",
    },
    Fragment {
        key: keys::STR_CMP,
        unique: true,
        requires: &[keys::INCLUDE_STDINT, keys::INCLUDE_STRING],
        code: "\
static int16_t str_int16_t_cmp(const char *a, const char *b)
{
    return (int16_t)(strcmp(a, b) == 0);
}
",
    },
    Fragment {
        key: keys::STR_NUM_CAT,
        unique: true,
        requires: &[keys::STR_CAT, keys::INCLUDE_STDIO],
        code: "\
static char *str_int16_t_cat(const char *s, int16_t n)
{
    char digits[8];
    sprintf(digits, \"%d\", n);
    return str_cat(s, digits);
}
",
    },
    Fragment {
        key: keys::NUM_STR_CAT,
        unique: true,
        requires: &[keys::STR_CAT, keys::INCLUDE_STDIO],
        code: "\
static char *int16_t_str_cat(int16_t n, const char *s)
{
    char digits[8];
    sprintf(digits, \"%d\", n);
    return str_cat(digits, s);
}
",
    },
    Fragment {
        key: keys::DICT,
        unique: true,
        requires: &[keys::INCLUDE_STDINT, keys::STR_DUP],
        code: "\
typedef union {
    char *s;
    int16_t i;
} dict_val_t;

typedef struct dict_entry {
    char *key;
    dict_val_t val;
    int16_t val_is_str;
    struct dict_entry *next;
} dict_entry_t;

typedef struct {
    dict_entry_t *head;
} dict_t;

static dict_t *dict_create(void)
{
    dict_t *d = malloc(sizeof(dict_t));
    d->head = NULL;
    return d;
}

static dict_entry_t *dict_find(dict_t *d, const char *key)
{
    dict_entry_t *e = d->head;
    while (e) {
        if (strcmp(e->key, key) == 0) return e;
        e = e->next;
    }
    return NULL;
}

/* Entries own copies of key and value; overwriting releases the old
 * copies before installing new ones. */
static dict_entry_t *dict_put(dict_t *d, const char *key)
{
    dict_entry_t *e = dict_find(d, key);
    if (e) {
        if (e->val_is_str) free(e->val.s);
        return e;
    }
    e = malloc(sizeof(dict_entry_t));
    e->key = str_dup(key);
    e->next = d->head;
    d->head = e;
    return e;
}

static void dict_set_str_str(dict_t *d, const char *key, const char *value)
{
    dict_entry_t *e = dict_put(d, key);
    e->val.s = str_dup(value);
    e->val_is_str = 1;
}

static void dict_set_str_int(dict_t *d, const char *key, int16_t value)
{
    dict_entry_t *e = dict_put(d, key);
    e->val.i = value;
    e->val_is_str = 0;
}

#define DICT_CREATE() (dict_create())
#define DICT_SET_STR_STR(d, k, v) dict_set_str_str((d), (k), (v))
#define DICT_SET_STR_INT(d, k, v) dict_set_str_int((d), (k), (v))
#define DICT_GET(d, k, out) do { \\
    dict_entry_t *e_ = dict_find((d), (k)); \\
    if (e_) { memcpy(&(out), &e_->val, sizeof(out)); } \\
    else { memset(&(out), 0, sizeof(out)); } \\
} while (0)
",
    },
    Fragment {
        key: keys::DICT_FREE,
        unique: true,
        requires: &[keys::DICT],
        code: "\
static void dict_free(dict_t *d)
{
    dict_entry_t *e = d->head;
    while (e) {
        dict_entry_t *next = e->next;
        free(e->key);
        if (e->val_is_str) free(e->val.s);
        free(e);
        e = next;
    }
    free(d);
}

#define DICT_FREE(d) dict_free(d)
",
    },
    Fragment {
        key: keys::REGEX,
        unique: true,
        requires: &[
            keys::ARR_STR,
            keys::ARRAY_MACROS,
            keys::INCLUDE_STDLIB,
            keys::INCLUDE_STRING,
        ],
        code: "\
static arr_str_t regex_matches;

static int16_t re_here(const char *re, const char *text);

static int16_t re_star(int c, const char *re, const char *text)
{
    int16_t n = 0;
    for (;;) {
        int16_t m = re_here(re, text + n);
        if (m >= 0) return (int16_t)(n + m);
        if (text[n] == '\\0') return -1;
        if (c != '.' && text[n] != c) return -1;
        n++;
    }
}

/* Length matched at the head of text, or -1. Supports literal
 * characters, '.', '*', and '$'. */
static int16_t re_here(const char *re, const char *text)
{
    if (re[0] == '\\0') return 0;
    if (re[1] == '*') return re_star(re[0], re + 2, text);
    if (re[0] == '$' && re[1] == '\\0') return (int16_t)(*text == '\\0' ? 0 : -1);
    if (*text != '\\0' && (re[0] == '.' || re[0] == *text)) {
        int16_t m = re_here(re + 1, text + 1);
        return (int16_t)(m < 0 ? -1 : m + 1);
    }
    return -1;
}

/* Collect every non-overlapping match of pattern in text into the
 * global regex_matches array; returns the match count. Each call starts
 * a fresh array; the previous buffer belongs to the previous caller. */
static int16_t regex_match(const char *text, const char *pattern)
{
    int16_t count = 0;
    int16_t m;
    const char *re = pattern;
    int anchored = (pattern[0] == '^');
    ARRAY_CREATE(regex_matches);
    if (anchored) re = pattern + 1;
    for (;;) {
        m = re_here(re, text);
        if (m >= 0) {
            char *copy = malloc((size_t)m + 1);
            memcpy(copy, text, (size_t)m);
            copy[m] = '\\0';
            ARRAY_PUSH(regex_matches, copy);
            count++;
        }
        if (anchored) break;
        if (*text == '\\0') break;
        text += (m > 0) ? m : 1;
    }
    return count;
}

static void regex_clear_matches(void)
{
    int16_t i;
    for (i = 0; i < regex_matches.length; i++) {
        free(regex_matches.data[i]);
    }
    free(regex_matches.data);
    ARRAY_CREATE(regex_matches);
}
",
    },
    Fragment {
        key: keys::DISCARD,
        unique: true,
        requires: &[keys::INCLUDE_STDINT],
        code: "static int16_t _discard16;\n",
    },
    Fragment {
        key: keys::ITER,
        unique: true,
        requires: &[keys::INCLUDE_STDINT],
        code: "static int16_t _iter16;\n",
    },
];
