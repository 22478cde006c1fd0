//! Built-in document sources.

/// Template embedded in the system instruction. Its styling is the house
/// style the model is asked to keep.
pub const RESUME_TEMPLATE: &str = r#"import React from 'react';
import { Document, Page, Text, View, StyleSheet } from '@react-pdf/renderer';

const styles = StyleSheet.create({
  page: {
    flexDirection: 'column',
    backgroundColor: '#ffffff',
    padding: 30,
    fontFamily: 'Arial',
  },
  section: {
    marginBottom: 1,
  },
  header: {
    fontSize: 13,
    marginBottom: 8,
    textAlign: 'center',
    fontFamily: 'Arial',
    fontWeight: 'bold',
  },
  subHeader: {
    fontSize: 10,
    marginBottom: 5,
    textAlign: 'center',
    fontFamily: 'Arial',
  },
  sectionTitle: {
    fontSize: 11,
    marginBottom: 3,
    marginTop: 5,
    fontFamily: 'Arial',
    fontWeight: 'bold',
    borderBottom: 1,
    paddingBottom: 2,
  },
  experienceTitle: {
    fontSize: 11,
    marginBottom: 3,
    justifyContent: 'space-between',
    flexDirection: 'row',
    fontFamily: 'Arial',
    fontWeight: 'bold',
  },
  experienceDate: {
    fontSize: 10,
    textAlign: 'right',
    fontFamily: 'Arial',
    fontStyle: 'italic',
  },
  bulletPointContainer: {
    flexDirection: 'row',
    marginBottom: 1,
    lineHeight: 1.3,
  },
  bullet: {
    fontSize: 10,
    fontFamily: 'Arial',
    width: 10,
  },
  bulletText: {
    fontSize: 10,
    fontFamily: 'Arial',
    flex: 1,
  }
});

const ResumeDocument = () => (
  <Document>
    <Page size="A4" style={styles.page}>
      {/* Header Section */}
      <View style={styles.section}>
        <Text style={styles.header}>JOHN DOE</Text>
        <Text style={styles.subHeader}>Software Engineer | contact@email.com | (123) 456-7890 | github.com/johndoe</Text>
      </View>

      {/* Summary Section */}
      <View style={styles.section}>
        <Text style={styles.sectionTitle}>SUMMARY</Text>
        <View style={styles.bulletPointContainer}>
          <Text style={styles.bulletText}>Experienced software engineer with expertise in web development</Text>
        </View>
      </View>

      {/* Experience Section */}
      <View style={styles.section}>
        <Text style={styles.sectionTitle}>EXPERIENCE</Text>
        <View style={{ marginBottom: 10 }}>
          <View style={styles.experienceTitle}>
            <Text>Software Engineer, Tech Company</Text> <Text style={styles.experienceDate}>01/2020 - Present</Text>
          </View>
          <View style={styles.bulletPointContainer}>
            <Text style={styles.bullet}>•</Text>
            <Text style={styles.bulletText}>Spearheaded development of payment gateway integration for e-commerce platform, leading team of 5 developers and reducing transaction processing time by 35%</Text>
          </View>
          <View style={styles.bulletPointContainer}>
            <Text style={styles.bullet}>•</Text>
            <Text style={styles.bulletText}>Architected and implemented microservices migration strategy for legacy monolithic application, resulting in 60% improved deployment frequency and 45% reduction in system downtime</Text>
          </View>
        </View>
      </View>

      {/* Skills Section */}
      <View style={styles.section}>
        <Text style={styles.sectionTitle}>SKILLS</Text>
        <View style={styles.bulletPointContainer}>
          <Text style={styles.bullet}>•</Text>
          <Text style={styles.bulletText}>JavaScript, React, Node.js</Text>
        </View>
        <View style={styles.bulletPointContainer}>
          <Text style={styles.bullet}>•</Text>
          <Text style={styles.bulletText}>Python, TypeScript</Text>
        </View>
      </View>

      {/* Education Section */}
      <View style={styles.section}>
        <Text style={styles.sectionTitle}>EDUCATION</Text>
        <View style={{ marginBottom: 10 }}>
          <View style={styles.experienceTitle}>
            <Text>Bachelor of Science in Computer Science, University Name</Text>
            <Text style={styles.experienceDate}>09/2015 - 05/2019</Text>
          </View>
        </View>
      </View>
    </Page>
  </Document>
);

export default ResumeDocument;
"#;

/// Active source of a fresh session.
pub const DEFAULT_TEMPLATE: &str = r#"import React from 'react';
import { Document, Page, Text, View, StyleSheet } from '@react-pdf/renderer';

const styles = StyleSheet.create({
  page: {
    flexDirection: 'column',
    backgroundColor: '#ffffff',
    padding: 30,
  },
  section: {
    marginBottom: 1,
  },
  header: {
    fontSize: 14,
    marginBottom: 8,
    textAlign: 'center',
  },
  subHeader: {
    fontSize: 11,
    marginBottom: 5,
    color: '#666',
    textAlign: 'center',
  },
  sectionTitle: {
    fontSize: 14,
    marginBottom: 3,
    marginTop: 5,
    fontWeight: 'bold',
    borderBottomWidth: 1,
    paddingVertical: 0,
    paddingHorizontal: 0,
    textTransform: 'uppercase',
    marginLeft: 10,
    marginRight: 10,
    paddingBottom: 2,
    textAlign: 'left',
  },
  experienceTitle: {
    fontSize: 12,
    marginBottom: 3,
    fontWeight: 'bold',
    flexDirection: 'row',
    justifyContent: 'space-between',
    marginLeft: 10,
    marginRight: 10,
  },
  experienceCompanyName: {
    // Style for company name if needed
  },
  experienceDate: {
    fontSize: 11,
    color: '#888',
    fontStyle: 'italic',
    textAlign: 'right',
  },
  experienceDetails: {
    fontSize: 11,
    marginBottom: 3,
    color: '#666',
  },
  bulletPoint: {
    fontSize: 11,
    marginBottom: 3,
    marginLeft: 15,
    lineHeight: 1.3,
    maxWidth: 500,
  }
});

const ResumeDocument = () => (
  <Document>
    <Page size="A4" style={styles.page}>
      {/* Header Section */}
      <View style={styles.section}>
        <Text style={styles.header}>JOHN DOE</Text>
        <Text style={styles.subHeader}>Software Engineer</Text>
        <Text style={styles.subHeader}>contact@email.com</Text>
      </View>

      {/* Summary Section */}
      <View style={styles.section}>
        <Text style={styles.sectionTitle}>SUMMARY</Text>
        <Text style={styles.bulletPoint}>
          Experienced software engineer with expertise in web development
        </Text>
      </View>

      {/* Experience Section */}
      <View style={styles.section}>
        <Text style={styles.sectionTitle}>EXPERIENCE</Text>
        <View style={{ marginBottom: 10 }}>
          <View style={styles.experienceTitle}>
            <Text>Software Engineer, Tech Company</Text> <Text style={styles.experienceDate}>01/2020 - Present</Text>
          </View>
          <Text style={styles.bulletPoint}>• Spearheaded development of payment gateway integration for e-commerce platform, leading team of 5 developers and reducing transaction processing time by 35%</Text>
          <Text style={styles.bulletPoint}>• Architected and implemented microservices migration strategy for legacy monolithic application, resulting in 60% improved deployment frequency and 45% reduction in system downtime</Text>
        </View>
      </View>

      {/* Skills Section */}
      <View style={styles.section}>
        <Text style={styles.sectionTitle}>SKILLS</Text>
        <Text style={styles.bulletPoint}>• JavaScript, React, Node.js</Text>
        <Text style={styles.bulletPoint}>• Python, TypeScript</Text>
      </View>

      {/* Education Section */}
      <View style={styles.section}>
        <Text style={styles.sectionTitle}>EDUCATION</Text>
        <View style={{ marginBottom: 10 }}>
          <View style={styles.experienceTitle}>
            <Text>Bachelor of Science in Computer Science, University Name</Text>
            <Text style={styles.experienceDate}>09/2015 - 05/2019</Text>
          </View>
        </View>
      </View>
    </Page>
  </Document>
);

export default ResumeDocument;
"#;
