// SPDX-License-Identifier: PMPL-1.0-or-later

//! Built-in framework knowledge base

use super::strings;
use crate::types::FrameworkConfig;
use std::collections::BTreeMap;

struct Template {
    name: &'static str,
    description: &'static str,
    indicators: &'static [&'static str],
    hidden_imports: &'static [&'static str],
    collect_all: &'static [&'static str],
    collect_data: &'static [&'static str],
    collect_binaries: &'static [&'static str],
    data_files: &'static [&'static str],
    recommendations: &'static [&'static str],
}

const NONE: &[&str] = &[];

const TEMPLATES: &[Template] = &[
    Template {
        name: "django",
        description: "Django web framework",
        indicators: &["django"],
        hidden_imports: &[
            "django.core.management",
            "django.core.management.commands",
            "django.contrib.auth",
            "django.contrib.contenttypes",
            "django.contrib.sessions",
            "django.contrib.messages",
            "django.contrib.staticfiles",
            "django.contrib.admin",
            "django.db.backends.sqlite3",
            "django.template.loaders.filesystem",
            "django.template.loaders.app_directories",
        ],
        collect_all: &["django"],
        collect_data: &["django"],
        collect_binaries: NONE,
        data_files: &["templates", "static", "locale", "media", "staticfiles"],
        recommendations: &[
            "Use --collect-all django",
            "Bundle the templates and static directories",
            "Check that database settings are packaged",
        ],
    },
    Template {
        name: "flask",
        description: "Flask web framework",
        indicators: &["flask", "Flask"],
        hidden_imports: &[
            "flask.json",
            "flask.logging",
            "jinja2.ext",
            "werkzeug.serving",
            "werkzeug.middleware",
            "werkzeug.middleware.proxy_fix",
            "click",
            "itsdangerous",
        ],
        collect_all: &["flask", "jinja2", "werkzeug"],
        collect_data: &["flask"],
        collect_binaries: NONE,
        data_files: &["templates", "static"],
        recommendations: &[
            "Use --collect-all flask",
            "Bundle the templates and static directories",
        ],
    },
    Template {
        name: "fastapi",
        description: "FastAPI web framework",
        indicators: &["fastapi", "FastAPI"],
        hidden_imports: &[
            "uvicorn",
            "uvicorn.main",
            "uvicorn.config",
            "starlette",
            "pydantic",
            "pydantic.validators",
            "pydantic.typing",
        ],
        collect_all: &["fastapi", "uvicorn", "starlette", "pydantic"],
        collect_data: NONE,
        collect_binaries: NONE,
        data_files: NONE,
        recommendations: &[
            "Use --collect-all fastapi",
            "Include the uvicorn server modules",
        ],
    },
    Template {
        name: "opencv",
        description: "OpenCV computer vision library",
        indicators: &["cv2", "opencv"],
        hidden_imports: &[
            "numpy.core._multiarray_umath",
            "numpy.core._multiarray_tests",
            "numpy.linalg._umath_linalg",
            "numpy.fft._pocketfft_internal",
        ],
        collect_all: &["cv2", "numpy"],
        collect_data: NONE,
        collect_binaries: &["cv2"],
        data_files: NONE,
        recommendations: &[
            "Use --collect-all cv2",
            "Native libraries shipped with cv2 may need --collect-binaries",
        ],
    },
    Template {
        name: "matplotlib",
        description: "Matplotlib plotting library",
        indicators: &["matplotlib", "plt"],
        hidden_imports: &[
            "matplotlib.backends.backend_tkagg",
            "matplotlib.backends.backend_qt5agg",
            "matplotlib.backends.backend_agg",
            "matplotlib.figure",
            "matplotlib.font_manager",
            "matplotlib._path",
            "matplotlib.ft2font",
        ],
        collect_all: &["matplotlib"],
        collect_data: &["matplotlib"],
        collect_binaries: NONE,
        data_files: &["matplotlib/mpl-data"],
        recommendations: &[
            "Use --collect-all matplotlib",
            "Bundle fonts and matplotlibrc data",
        ],
    },
    Template {
        name: "numpy",
        description: "NumPy numerical library",
        indicators: &["numpy", "np"],
        hidden_imports: &[
            "numpy.core._multiarray_umath",
            "numpy.core._multiarray_tests",
            "numpy.linalg._umath_linalg",
            "numpy.fft._pocketfft_internal",
            "numpy.random._common",
            "numpy.random.bit_generator",
            "numpy.random._bounded_integers",
            "numpy.random._mt19937",
            "numpy.random.mtrand",
        ],
        collect_all: &["numpy"],
        collect_data: NONE,
        collect_binaries: NONE,
        data_files: NONE,
        recommendations: &["Use --collect-all numpy"],
    },
    Template {
        name: "pandas",
        description: "pandas data analysis library",
        indicators: &["pandas", "pd"],
        hidden_imports: &[
            "pandas._libs.tslibs.timedeltas",
            "pandas._libs.tslibs.np_datetime",
            "pandas._libs.tslibs.nattype",
            "pandas._libs.tslibs.timestamps",
            "pandas._libs.properties",
            "pandas.io.formats.style",
        ],
        collect_all: &["pandas"],
        collect_data: NONE,
        collect_binaries: NONE,
        data_files: NONE,
        recommendations: &["Use --collect-all pandas"],
    },
    Template {
        name: "tensorflow",
        description: "TensorFlow machine learning library",
        indicators: &["tensorflow", "tf"],
        hidden_imports: &[
            "tensorflow.python",
            "tensorflow.python.platform",
            "tensorflow.python.ops",
        ],
        collect_all: &["tensorflow"],
        collect_data: NONE,
        collect_binaries: NONE,
        data_files: NONE,
        recommendations: &[
            "Use --collect-all tensorflow",
            "tensorflow and tensorflow-gpu must not be installed together",
        ],
    },
    Template {
        name: "pytorch",
        description: "PyTorch machine learning library",
        indicators: &["torch", "torchvision", "pytorch"],
        hidden_imports: &["torch._C", "torch.nn", "torch.optim"],
        collect_all: &["torch", "torchvision"],
        collect_data: NONE,
        collect_binaries: NONE,
        data_files: NONE,
        recommendations: &[
            "Use --collect-all torch",
            "Check CUDA compatibility when packaging GPU builds",
        ],
    },
    Template {
        name: "scikit_learn",
        description: "scikit-learn machine learning library",
        indicators: &["sklearn", "scikit-learn"],
        hidden_imports: &[
            "sklearn.utils._cython_blas",
            "sklearn.neighbors.typedefs",
            "sklearn.neighbors.quad_tree",
            "sklearn.tree._utils",
        ],
        collect_all: &["sklearn"],
        collect_data: NONE,
        collect_binaries: NONE,
        data_files: NONE,
        recommendations: &["Use --collect-all sklearn"],
    },
    Template {
        name: "pyqt5",
        description: "PyQt5 GUI toolkit",
        indicators: &["PyQt5"],
        hidden_imports: &[
            "PyQt5.sip",
            "sip",
            "PyQt5.QtCore",
            "PyQt5.QtGui",
            "PyQt5.QtWidgets",
            "PyQt5.QtNetwork",
            "PyQt5.QtMultimedia",
        ],
        collect_all: &["PyQt5"],
        collect_data: NONE,
        collect_binaries: NONE,
        data_files: NONE,
        recommendations: &[
            "Use --collect-all PyQt5",
            "Qt plugins may need to be bundled separately",
        ],
    },
    Template {
        name: "pyqt6",
        description: "PyQt6 GUI toolkit",
        indicators: &["PyQt6"],
        hidden_imports: &[
            "PyQt6.sip",
            "PyQt6.QtCore",
            "PyQt6.QtGui",
            "PyQt6.QtWidgets",
        ],
        collect_all: &["PyQt6"],
        collect_data: NONE,
        collect_binaries: NONE,
        data_files: NONE,
        recommendations: &[
            "Use --collect-all PyQt6",
            "Do not mix PyQt5 and PyQt6 in one bundle",
        ],
    },
    Template {
        name: "tkinter",
        description: "Tkinter GUI toolkit",
        indicators: &["tkinter", "Tkinter"],
        hidden_imports: &[
            "tkinter.ttk",
            "tkinter.messagebox",
            "tkinter.filedialog",
            "_tkinter",
        ],
        collect_all: NONE,
        collect_data: NONE,
        collect_binaries: NONE,
        data_files: NONE,
        recommendations: &["Tcl/Tk runtime files may need to be bundled"],
    },
    Template {
        name: "requests",
        description: "Requests HTTP library",
        indicators: &["requests"],
        hidden_imports: &["urllib3", "certifi", "chardet", "idna"],
        collect_all: &["requests", "urllib3", "certifi"],
        collect_data: NONE,
        collect_binaries: NONE,
        data_files: NONE,
        recommendations: &[
            "Use --collect-all requests",
            "Bundle the certifi CA bundle",
        ],
    },
    Template {
        name: "selenium",
        description: "Selenium browser automation",
        indicators: &["selenium"],
        hidden_imports: &[
            "selenium.webdriver.chrome",
            "selenium.webdriver.firefox",
            "selenium.webdriver.edge",
            "selenium.webdriver.common",
        ],
        collect_all: &["selenium"],
        collect_data: NONE,
        collect_binaries: NONE,
        data_files: NONE,
        recommendations: &[
            "Use --collect-all selenium",
            "Browser drivers are not bundled automatically",
        ],
    },
    Template {
        name: "pillow",
        description: "Pillow imaging library",
        indicators: &["PIL", "Pillow"],
        hidden_imports: &["PIL._imaging", "PIL._imagingft", "PIL._imagingmath"],
        collect_all: &["PIL"],
        collect_data: NONE,
        collect_binaries: NONE,
        data_files: NONE,
        recommendations: &["Use --collect-all PIL"],
    },
];

pub(super) fn builtin_frameworks() -> BTreeMap<String, FrameworkConfig> {
    TEMPLATES
        .iter()
        .map(|t| {
            (
                t.name.to_string(),
                FrameworkConfig {
                    description: Some(t.description.to_string()),
                    indicators: strings(t.indicators),
                    hidden_imports: strings(t.hidden_imports),
                    collect_all: strings(t.collect_all),
                    collect_data: strings(t.collect_data),
                    collect_binaries: strings(t.collect_binaries),
                    data_files: strings(t.data_files),
                    recommendations: strings(t.recommendations),
                },
            )
        })
        .collect()
}
