//! Go runtime prelude
//!
//! Defines the dynamic value every koi expression evaluates to:
//!
//! ```text
//! type KoiValue struct { Type string; Raw any; Methods map[string]KoiMethod }
//! ```
//!
//! `Type` is the runtime tag (`int`, `[]float`, `circle`), `Raw` the Go
//! payload and `Methods` the string-keyed method table filled in by `new`.
//! Calls whose receiver type is unknown at compile time go through
//! `Koi_Dispatch`, which falls back to the builtin methods of primitive tags.

/// Go packages the prelude needs
pub const PRELUDE_IMPORTS: [&str; 2] = ["fmt", "math"];

/// Runtime support library emitted after the imports of every Go file
pub const PRELUDE: &str = r#"type KoiMethod func(args ...KoiValue) KoiValue

type KoiValue struct {
	Type    string
	Raw     any
	Methods map[string]KoiMethod
}

func (v KoiValue) String() string {
	return fmt.Sprintf("%v", v.Raw)
}

func (v KoiValue) Tag() string {
	return v.Type
}

func (v KoiValue) Invoke(name string, args ...KoiValue) KoiValue {
	method, ok := v.Methods[name]
	if !ok {
		panic(fmt.Sprintf("koi: %s has no field %s", v.Type, name))
	}
	return method(append([]KoiValue{v}, args...)...)
}

func Koi_Static(value KoiValue) KoiMethod {
	return func(args ...KoiValue) KoiValue {
		return value
	}
}

func Koi_Int(v int) KoiValue {
	return KoiValue{Type: "int", Raw: v}
}

func Koi_Float(v float64) KoiValue {
	return KoiValue{Type: "float", Raw: v}
}

func Koi_String(v string) KoiValue {
	return KoiValue{Type: "string", Raw: v}
}

func Koi_Bool(v bool) KoiValue {
	return KoiValue{Type: "bool", Raw: v}
}

func Koi_Array(typ string, items ...KoiValue) KoiValue {
	return KoiValue{Type: typ, Raw: items}
}

func Koi_Dispatch(recv KoiValue, name string, args ...KoiValue) KoiValue {
	method, ok := recv.Methods[name]
	if !ok {
		method, ok = koiBuiltinMethod(recv.Type, name)
	}
	if !ok {
		panic(fmt.Sprintf("koi: %s has no field %s", recv.Type, name))
	}
	return method(append([]KoiValue{recv}, args...)...)
}

func koiBuiltinMethod(tag string, name string) (KoiMethod, bool) {
	if tag == "string" && name == "length" {
		return Koi_String_length, true
	}
	if len(tag) < 2 || tag[:2] != "[]" {
		return nil, false
	}
	switch name {
	case "length":
		return Koi_Array_length, true
	case "append_value_int":
		return Koi_Array_append_value_int, true
	case "append_value_float":
		return Koi_Array_append_value_float, true
	case "append_value_string":
		return Koi_Array_append_value_string, true
	case "append_value_bool":
		return Koi_Array_append_value_bool, true
	}
	return nil, false
}

func Koi_Truthy(v KoiValue) bool {
	switch raw := v.Raw.(type) {
	case nil:
		return false
	case bool:
		return raw
	case int:
		return raw != 0
	case float64:
		return raw != 0
	case string:
		return raw != ""
	}
	return true
}

func Koi_Int_of(v KoiValue) int {
	switch raw := v.Raw.(type) {
	case int:
		return raw
	case float64:
		return int(raw)
	}
	panic(fmt.Sprintf("koi: %s is not a number", v.Type))
}

func koiFloat(v KoiValue) (float64, bool) {
	switch raw := v.Raw.(type) {
	case int:
		return float64(raw), true
	case float64:
		return raw, true
	}
	return 0, false
}

func koiArith(op string, a, b KoiValue) KoiValue {
	if x, ok := a.Raw.(int); ok {
		if y, ok := b.Raw.(int); ok {
			switch op {
			case "+":
				return Koi_Int(x + y)
			case "-":
				return Koi_Int(x - y)
			case "*":
				return Koi_Int(x * y)
			case "/":
				return Koi_Int(x / y)
			case "%":
				return Koi_Int(x % y)
			}
		}
	}
	x, okx := koiFloat(a)
	y, oky := koiFloat(b)
	if okx && oky {
		switch op {
		case "+":
			return Koi_Float(x + y)
		case "-":
			return Koi_Float(x - y)
		case "*":
			return Koi_Float(x * y)
		case "/":
			return Koi_Float(x / y)
		case "%":
			return Koi_Float(math.Mod(x, y))
		}
	}
	panic(fmt.Sprintf("koi: cannot apply %s to %s and %s", op, a.Type, b.Type))
}

func Koi_Add(a, b KoiValue) KoiValue {
	if x, ok := a.Raw.(string); ok {
		return Koi_String(x + b.String())
	}
	return koiArith("+", a, b)
}

func Koi_Sub(a, b KoiValue) KoiValue {
	return koiArith("-", a, b)
}

func Koi_Mul(a, b KoiValue) KoiValue {
	return koiArith("*", a, b)
}

func Koi_Div(a, b KoiValue) KoiValue {
	return koiArith("/", a, b)
}

func Koi_Mod(a, b KoiValue) KoiValue {
	return koiArith("%", a, b)
}

func koiCompare(a, b KoiValue) int {
	if x, ok := a.Raw.(string); ok {
		if y, ok := b.Raw.(string); ok {
			switch {
			case x < y:
				return -1
			case x > y:
				return 1
			}
			return 0
		}
	}
	x, okx := koiFloat(a)
	y, oky := koiFloat(b)
	if !okx || !oky {
		panic(fmt.Sprintf("koi: cannot compare %s and %s", a.Type, b.Type))
	}
	switch {
	case x < y:
		return -1
	case x > y:
		return 1
	}
	return 0
}

func Koi_Eq(a, b KoiValue) KoiValue {
	if x, ok := koiFloat(a); ok {
		if y, ok := koiFloat(b); ok {
			return Koi_Bool(x == y)
		}
	}
	return Koi_Bool(a.Type == b.Type && a.String() == b.String())
}

func Koi_Ne(a, b KoiValue) KoiValue {
	return Koi_Not(Koi_Eq(a, b))
}

func Koi_Lt(a, b KoiValue) KoiValue {
	return Koi_Bool(koiCompare(a, b) < 0)
}

func Koi_Le(a, b KoiValue) KoiValue {
	return Koi_Bool(koiCompare(a, b) <= 0)
}

func Koi_Gt(a, b KoiValue) KoiValue {
	return Koi_Bool(koiCompare(a, b) > 0)
}

func Koi_Ge(a, b KoiValue) KoiValue {
	return Koi_Bool(koiCompare(a, b) >= 0)
}

func Koi_And(a, b KoiValue) KoiValue {
	return Koi_Bool(Koi_Truthy(a) && Koi_Truthy(b))
}

func Koi_Or(a, b KoiValue) KoiValue {
	return Koi_Bool(Koi_Truthy(a) || Koi_Truthy(b))
}

func Koi_Not(v KoiValue) KoiValue {
	return Koi_Bool(!Koi_Truthy(v))
}

func Koi_Neg(v KoiValue) KoiValue {
	switch raw := v.Raw.(type) {
	case int:
		return Koi_Int(-raw)
	case float64:
		return Koi_Float(-raw)
	}
	panic(fmt.Sprintf("koi: cannot negate %s", v.Type))
}

func Koi_Index(v KoiValue, i KoiValue) KoiValue {
	index := Koi_Int_of(i)
	switch raw := v.Raw.(type) {
	case []KoiValue:
		return raw[index]
	case string:
		return Koi_String(string([]rune(raw)[index]))
	}
	panic(fmt.Sprintf("koi: cannot index %s", v.Type))
}

func koiItems(v KoiValue) []KoiValue {
	items, ok := v.Raw.([]KoiValue)
	if !ok {
		panic(fmt.Sprintf("koi: %s is not an array", v.Type))
	}
	return items
}

func koiAppend(args []KoiValue) KoiValue {
	items := append(append([]KoiValue{}, koiItems(args[0])...), args[1])
	return Koi_Array(args[0].Type, items...)
}

func Koi_Array_length(args ...KoiValue) KoiValue {
	return Koi_Int(len(koiItems(args[0])))
}

func Koi_Array_append_value_int(args ...KoiValue) KoiValue {
	return koiAppend(args)
}

func Koi_Array_append_value_float(args ...KoiValue) KoiValue {
	return koiAppend(args)
}

func Koi_Array_append_value_string(args ...KoiValue) KoiValue {
	return koiAppend(args)
}

func Koi_Array_append_value_bool(args ...KoiValue) KoiValue {
	return koiAppend(args)
}

func Koi_String_length(args ...KoiValue) KoiValue {
	raw, _ := args[0].Raw.(string)
	return Koi_Int(len([]rune(raw)))
}

func Koi_io_printLine(v KoiValue) KoiValue {
	fmt.Println(v.String())
	return KoiValue{}
}

func Koi_io_print(v KoiValue) KoiValue {
	fmt.Print(v.String())
	return KoiValue{}
}

func koiMath(v KoiValue, f func(float64) float64) KoiValue {
	x, ok := koiFloat(v)
	if !ok {
		panic(fmt.Sprintf("koi: %s is not a number", v.Type))
	}
	return Koi_Float(f(x))
}

func Koi_math_sin(v KoiValue) KoiValue {
	return koiMath(v, math.Sin)
}

func Koi_math_cos(v KoiValue) KoiValue {
	return koiMath(v, math.Cos)
}

func Koi_math_sqrt(v KoiValue) KoiValue {
	return koiMath(v, math.Sqrt)
}
"#;
